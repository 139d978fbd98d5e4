mod books;
mod config;
mod covers;
mod error;
mod export;
mod fields;
mod frontmatter;
mod notes;
mod series;
mod timeline;
mod vault;

pub use crate::books::{BOOKS_CATEGORY, BOOKS_DICT, export_books};
pub use crate::config::ExportConfig;
pub use crate::covers::{
    CoverReport, acquire_covers, rename_covers, repair_covers, sanitize_filename,
};
pub use crate::error::{Error, Result};
pub use crate::export::{
    CorpusScan, ExportReport, ScannedNote, normalize_date, scan_category, slugify,
};
pub use crate::fields::{
    FieldDict, FieldMap, FieldValue, belongs_to, clean_links, field_map_from_metadata,
    normalize_to_array, translate_fields,
};
pub use crate::frontmatter::{NoteFile, read_note, write_note};
pub use crate::notes::{NOTES_CATEGORY, NOTES_DICT, export_notes};
pub use crate::series::{SERIES_CATEGORY, SERIES_DICT, export_series};
pub use crate::timeline::{TIMELINE_CATEGORY, TIMELINE_DICT, export_timeline};
pub use crate::vault::{Vault, VaultPath};
