use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use regex::Regex;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::fields::{field_map_from_metadata, normalize_to_array};
use crate::frontmatter::{read_note, write_note};
use crate::{Error, Result, Vault};

const TITLE_KEY: &str = "Titel";
const AUTHOR_KEY: &str = "Autor";
const AUTHOR_PLACEHOLDER: &str = "unbekannt";
const COVER_EXTENSION: &str = ".jpg";

/// Summary of one cover maintenance pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverReport {
    pub processed: usize,
    /// Notes whose file or frontmatter was written.
    pub updated: usize,
    pub skipped: usize,
    pub conflicts: usize,
}

static NON_CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("valid regex"));
static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// Canonical cover filename for a title and author list. Deterministic and
/// total; the first author (or a placeholder) is joined onto the title.
pub fn sanitize_filename(title: &str, authors: &[String], max_len: usize) -> String {
    let author = authors
        .first()
        .map(String::as_str)
        .unwrap_or(AUTHOR_PLACEHOLDER);
    let joined = format!("{title}-{author}").to_lowercase();
    let replaced = NON_CANONICAL.replace_all(&joined, "-");
    let collapsed = HYPHEN_RUN.replace_all(&replaced, "-");
    let mut stem: String = collapsed.trim_matches('-').to_string();
    if stem.len() > max_len {
        let mut cut = max_len;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
        stem = stem.trim_end_matches('-').to_string();
    }
    format!("{stem}{COVER_EXTENSION}")
}

fn note_title_and_authors(fields: &crate::fields::FieldMap) -> (String, Vec<String>) {
    let title = fields
        .get(TITLE_KEY)
        .map(crate::fields::clean_links)
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();
    let authors = normalize_to_array(fields.get(AUTHOR_KEY))
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    (title, authors)
}

fn string_field(metadata: &serde_yaml::Mapping, key: &str) -> Option<String> {
    metadata
        .get(Value::String(key.into()))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

// ---- acquire -------------------------------------------------------------

/// Downloads pending cover URLs, optimizes oversized payloads and rewrites
/// the note to point at the stored file. A note carrying both a local cover
/// and a fresh URL is an update request: the stored file is replaced.
pub fn acquire_covers(vault: &Vault) -> CoverReport {
    let cfg = vault.config().clone();
    let mut report = CoverReport::default();

    for rel in vault.note_paths() {
        let abs = vault.to_abs(&rel);
        let mut note = match read_note(&abs) {
            Ok(n) => n,
            Err(err) => {
                warn!(path = rel.as_str_lossy(), %err, "skipping unparseable note");
                report.skipped += 1;
                continue;
            }
        };

        let Some(url) = string_field(&note.metadata, &cfg.cover_url_key) else {
            continue;
        };
        report.processed += 1;

        let fields = field_map_from_metadata(&note.metadata);
        let (title, authors) = note_title_and_authors(&fields);

        let bytes = match fetch_image(&url, cfg.cover_max_bytes) {
            Ok(b) => b,
            Err(err) => {
                warn!(title, authors = ?authors, %err, "cover fetch failed");
                report.skipped += 1;
                continue;
            }
        };

        let bytes = if bytes.len() as u64 > cfg.cover_reencode_threshold {
            match reencode_bounded(
                &bytes,
                cfg.cover_max_width,
                cfg.cover_max_height,
                cfg.cover_jpeg_quality,
            ) {
                Ok(optimized) => optimized,
                Err(err) => {
                    warn!(title, %err, "cover re-encode failed, keeping original bytes");
                    bytes
                }
            }
        } else {
            bytes
        };

        let filename = sanitize_filename(&title, &authors, cfg.cover_name_max_len);
        let cover_dir = vault.root().join(&cfg.cover_dir);
        if let Err(err) = std::fs::create_dir_all(&cover_dir) {
            warn!(path = %cover_dir.display(), %err, "cannot create cover directory");
            report.skipped += 1;
            continue;
        }
        let cover_abs = cover_dir.join(&filename);
        let previous = string_field(&note.metadata, &cfg.cover_key)
            .map(|existing| vault.root().join(existing))
            .filter(|p| p.exists());
        if previous.is_some() {
            info!(title, "replacing existing cover from new URL");
        }
        if let Err(err) = std::fs::write(&cover_abs, &bytes) {
            warn!(path = %cover_abs.display(), %err, "cannot write cover file");
            report.skipped += 1;
            continue;
        }
        // A title/author edit since the last download changes the canonical
        // name; drop the old file so it cannot linger orphaned.
        if let Some(old_abs) = previous {
            if !is_same_file(&old_abs, &cover_abs) {
                if let Err(err) = std::fs::remove_file(&old_abs) {
                    warn!(path = %old_abs.display(), %err, "cannot remove superseded cover");
                }
            }
        }

        let cover_rel = rel_cover_path(&cfg.cover_dir, &filename);
        note.metadata
            .insert(Value::String(cfg.cover_key.clone()), Value::String(cover_rel));
        // Clear the URL but keep the key so future updates reuse the field.
        note.metadata.insert(
            Value::String(cfg.cover_url_key.clone()),
            Value::String(String::new()),
        );
        match write_note(&abs, &note.metadata, &note.body) {
            Ok(()) => {
                info!(title, filename, bytes = bytes.len(), "cover acquired");
                report.updated += 1;
            }
            Err(err) => {
                warn!(path = rel.as_str_lossy(), %err, "cannot rewrite note");
                report.skipped += 1;
            }
        }
    }

    report
}

fn rel_cover_path(cover_dir: &Path, filename: &str) -> String {
    let joined = cover_dir.join(filename);
    joined.to_string_lossy().replace('\\', "/")
}

fn fetch_image(url: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let response = ureq::get(url).call().map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let content_type = response.content_type().to_string();
    if !content_type.starts_with("image/") {
        return Err(Error::Fetch {
            url: url.to_string(),
            reason: format!("not an image content type: {content_type}"),
        });
    }

    let mut reader = response.into_reader().take(max_bytes + 1);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if buf.len() as u64 > max_bytes {
        return Err(Error::OversizedPayload {
            url: url.to_string(),
            bytes: buf.len() as u64,
        });
    }
    Ok(buf)
}

fn reencode_bounded(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> std::result::Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width() > max_width || img.height() > max_height {
        img.resize(max_width, max_height, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };
    // JPEG has no alpha channel.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

// ---- rename --------------------------------------------------------------

/// Moves every referenced cover file to its canonical name derived from the
/// note's current title and author, rewriting the note to match. Case-only
/// renames go through a unique temporary name so case-insensitive storage
/// cannot turn the move into a no-op.
pub fn rename_covers(vault: &Vault) -> CoverReport {
    let cfg = vault.config().clone();
    let mut report = CoverReport::default();

    for rel in vault.note_paths() {
        let abs = vault.to_abs(&rel);
        let mut note = match read_note(&abs) {
            Ok(n) => n,
            Err(err) => {
                warn!(path = rel.as_str_lossy(), %err, "skipping unparseable note");
                report.skipped += 1;
                continue;
            }
        };

        let Some(current_rel) = string_field(&note.metadata, &cfg.cover_key) else {
            continue;
        };
        report.processed += 1;

        let fields = field_map_from_metadata(&note.metadata);
        let (title, authors) = note_title_and_authors(&fields);
        let expected_name = sanitize_filename(&title, &authors, cfg.cover_name_max_len);

        let source_abs = vault.root().join(&current_rel);
        let current_name = source_abs
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        if current_name == expected_name {
            debug!(title, "cover already canonical");
            continue;
        }
        if !source_abs.exists() {
            warn!(title, path = current_rel, "cover file missing, leaving for repair pass");
            report.skipped += 1;
            continue;
        }

        let parent = source_abs
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| vault.root().to_path_buf());
        let target_abs = parent.join(&expected_name);
        let case_only = current_name.eq_ignore_ascii_case(&expected_name);

        // An existing target is only acceptable when it is the source itself
        // seen through a case-insensitive filesystem; a distinct file at the
        // target name is a conflict, never an overwrite.
        if target_abs.exists() && !is_same_file(&source_abs, &target_abs) {
            let err = Error::RenameConflict {
                from: source_abs.clone(),
                target: target_abs.clone(),
            };
            warn!(title, %err, "rename conflict, note left untouched");
            report.conflicts += 1;
            continue;
        }

        let moved = if case_only {
            rename_via_temp(&source_abs, &target_abs)
        } else {
            std::fs::rename(&source_abs, &target_abs)
                .map_err(|e| Error::io(&source_abs, e))
        };
        if let Err(err) = moved {
            warn!(title, %err, "cover rename failed");
            report.skipped += 1;
            continue;
        }

        let new_rel = match target_abs
            .strip_prefix(vault.root())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
        {
            Ok(p) => p,
            Err(_) => rel_cover_path(&cfg.cover_dir, &expected_name),
        };
        note.metadata
            .insert(Value::String(cfg.cover_key.clone()), Value::String(new_rel));
        match write_note(&abs, &note.metadata, &note.body) {
            Ok(()) => {
                info!(title, from = current_name, to = expected_name, "cover renamed");
                report.updated += 1;
            }
            Err(err) => {
                warn!(path = rel.as_str_lossy(), %err, "cannot rewrite note");
                report.skipped += 1;
            }
        }
    }

    report
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

fn rename_via_temp(source: &Path, target: &Path) -> Result<()> {
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    let temp = parent.join(format!(
        ".cover-rename-{}-{}.tmp",
        std::process::id(),
        target
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("cover")
    ));
    std::fs::rename(source, &temp).map_err(|e| Error::io(source, e))?;
    std::fs::rename(&temp, target).map_err(|e| Error::io(&temp, e))
}

// ---- repair --------------------------------------------------------------

/// Brings every note back to a consistent two-field cover shape: a local
/// path that points at a real file (cleared otherwise) and an always-present
/// URL field. Writes nothing when a note is already consistent.
pub fn repair_covers(vault: &Vault) -> CoverReport {
    let cfg = vault.config().clone();
    let mut report = CoverReport::default();

    for rel in vault.note_paths() {
        let abs = vault.to_abs(&rel);
        let mut note = match read_note(&abs) {
            Ok(n) => n,
            Err(err) => {
                warn!(path = rel.as_str_lossy(), %err, "skipping unparseable note");
                report.skipped += 1;
                continue;
            }
        };
        report.processed += 1;

        let mut changed = false;

        if let Some(current) = string_field(&note.metadata, &cfg.cover_key) {
            if !vault.root().join(&current).exists() {
                info!(path = rel.as_str_lossy(), cover = current, "clearing dangling cover path");
                note.metadata.insert(
                    Value::String(cfg.cover_key.clone()),
                    Value::String(String::new()),
                );
                changed = true;
            }
        }

        let url_key = Value::String(cfg.cover_url_key.clone());
        if !note.metadata.contains_key(&url_key) {
            note.metadata.insert(url_key, Value::String(String::new()));
            changed = true;
        }

        if changed {
            match write_note(&abs, &note.metadata, &note.body) {
                Ok(()) => report.updated += 1,
                Err(err) => {
                    warn!(path = rel.as_str_lossy(), %err, "cannot rewrite note");
                    report.skipped += 1;
                }
            }
        }
    }

    report
}
