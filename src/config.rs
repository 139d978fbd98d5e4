use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory names to ignore anywhere in the path.
    pub ignore_dirs: Vec<String>,
    /// Path segment marking template notes; matched by substring.
    pub template_marker: String,
    /// File extension (without dot) that is considered a note.
    pub note_extension: String,
    /// Frontmatter key holding category membership.
    pub category_key: String,
    /// Directory the JSON documents are written to.
    pub output_dir: PathBuf,
    /// Directory (relative to vault root) where cover images live.
    pub cover_dir: PathBuf,
    /// Directory published covers are copied into.
    pub publish_dir: PathBuf,
    /// URL prefix for published cover files.
    pub publish_base_url: String,
    /// Frontmatter key for the local cover path.
    pub cover_key: String,
    /// Frontmatter key for a pending remote cover URL.
    pub cover_url_key: String,
    /// Covers above this byte size are re-encoded.
    pub cover_reencode_threshold: u64,
    /// Fetches above this byte size are rejected.
    pub cover_max_bytes: u64,
    /// Re-encode bounds, aspect ratio preserved, never upscaled.
    pub cover_max_width: u32,
    pub cover_max_height: u32,
    /// JPEG quality for re-encoded covers.
    pub cover_jpeg_quality: u8,
    /// Maximum length of a sanitized cover filename stem.
    pub cover_name_max_len: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: vec![
                ".obsidian".into(),
                ".git".into(),
                ".trash".into(),
                "node_modules".into(),
            ],
            template_marker: "Vorlagen".into(),
            note_extension: "md".into(),
            category_key: "Kategorie".into(),
            output_dir: PathBuf::from("export"),
            cover_dir: PathBuf::from("Cover"),
            publish_dir: PathBuf::from("export/covers"),
            publish_base_url: "https://assets.example.org/covers".into(),
            cover_key: "cover".into(),
            cover_url_key: "cover-download".into(),
            cover_reencode_threshold: 100 * 1024,
            cover_max_bytes: 10 * 1024 * 1024,
            cover_max_width: 600,
            cover_max_height: 900,
            cover_jpeg_quality: 80,
            cover_name_max_len: 100,
        }
    }
}
