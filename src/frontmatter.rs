use std::path::Path;

use serde_yaml::Mapping;

use crate::{Error, Result};

/// Parsed note: frontmatter mapping plus the untouched body text.
#[derive(Debug, Clone)]
pub struct NoteFile {
    pub metadata: Mapping,
    pub body: String,
}

/// Reads a note and splits it into metadata and body.
///
/// Fails when the file has no well-formed frontmatter block; corpus scans
/// catch this per note and skip rather than abort.
pub fn read_note(path: &Path) -> Result<NoteFile> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let (fm_text, body) = split_frontmatter(&content).ok_or_else(|| Error::Frontmatter {
        path: path.to_path_buf(),
        reason: "missing or unclosed frontmatter fence".into(),
    })?;

    let metadata: Mapping = serde_yaml::from_str(fm_text).map_err(|e| Error::Frontmatter {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(NoteFile {
        metadata,
        body: body.to_string(),
    })
}

/// Writes a note back, re-serializing the metadata and keeping the body
/// byte-for-byte. serde_yaml preserves mapping insertion order, so keys keep
/// the order they were read in (plus any appended ones).
pub fn write_note(path: &Path, metadata: &Mapping, body: &str) -> Result<()> {
    let yaml = serde_yaml::to_string(metadata)?;
    let content = format!("---\n{yaml}---\n{body}");
    std::fs::write(path, content).map_err(|e| Error::io(path, e))
}

fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    // Find a closing fence on its own line, accepting "---\n" and "---\r\n".
    let mut idx = 0usize;
    while idx < rest.len() {
        let line_end = match rest[idx..].find('\n') {
            Some(off) => idx + off + 1,
            None => rest.len(),
        };
        let line = rest[idx..line_end].trim_end_matches(['\r', '\n']);
        if line == "---" {
            return Some((&rest[..idx], &rest[line_end..]));
        }
        idx = line_end;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn read_splits_metadata_and_body() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.md");
        std::fs::write(&path, "---\nTitel: Dune\nSeiten: 412\n---\n\n# Dune\nbody\n").unwrap();

        let note = read_note(&path).unwrap();
        assert_eq!(
            note.metadata.get(Value::String("Titel".into())),
            Some(&Value::String("Dune".into()))
        );
        assert_eq!(note.body, "\n# Dune\nbody\n");
    }

    #[test]
    fn missing_fence_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.md");
        std::fs::write(&path, "# No frontmatter\n").unwrap();
        assert!(matches!(
            read_note(&path),
            Err(Error::Frontmatter { .. })
        ));
    }

    #[test]
    fn unclosed_fence_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.md");
        std::fs::write(&path, "---\nTitel: x\n").unwrap();
        assert!(read_note(&path).is_err());
    }

    #[test]
    fn write_roundtrip_preserves_body_and_key_order() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.md");
        std::fs::write(&path, "---\nTitel: Dune\nAutor: Frank Herbert\n---\nbody text\n").unwrap();

        let note = read_note(&path).unwrap();
        write_note(&path, &note.metadata, &note.body).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let titel_at = raw.find("Titel").unwrap();
        let autor_at = raw.find("Autor").unwrap();
        assert!(titel_at < autor_at);
        assert!(raw.ends_with("---\nbody text\n"));

        let again = read_note(&path).unwrap();
        assert_eq!(again.metadata, note.metadata);
        assert_eq!(again.body, note.body);
    }
}
