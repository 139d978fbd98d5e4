use tracing::warn;

use crate::export::{
    ExportReport, coerce_array_fields, coerce_float_field, coerce_int_field, coerce_status_field,
    group_by_status, normalize_date_field, scan_category, write_document,
};
use crate::fields::{FieldDict, FieldMap, FieldValue, translate_fields};
use crate::{Result, Vault};

pub const BOOKS_CATEGORY: &str = "Bücher";

/// German source keys → site keys for book notes.
pub const BOOKS_DICT: FieldDict = &[
    ("Titel", "title"),
    ("Autor", "author"),
    ("Genre", "genre"),
    ("Seiten", "pages"),
    ("Bewertung", "rating"),
    ("Status", "status"),
    ("Gestartet", "started"),
    ("Beendet", "finished"),
    ("cover", "cover"),
];

pub fn export_books(vault: &Vault) -> Result<ExportReport> {
    let scan = scan_category(vault, BOOKS_CATEGORY);

    let mut items = Vec::new();
    for note in scan.notes {
        let mut item = translate_fields(&note.fields, BOOKS_DICT);
        coerce_status_field(&mut item, "status");
        coerce_array_fields(&mut item, &["author", "genre"]);
        coerce_int_field(&mut item, "pages");
        coerce_float_field(&mut item, "rating");
        normalize_date_field(&mut item, "started");
        normalize_date_field(&mut item, "finished");
        publish_cover(vault, &mut item);
        items.push(item);
    }

    let count = items.len();
    let (groups, buckets, _) = group_by_status(items, "status", "finished");
    let (output_path, last_updated) =
        write_document(&vault.config().output_dir, "books", groups, count)?;

    Ok(ExportReport {
        collection: "books",
        output_path,
        count,
        skipped: scan.skipped,
        buckets,
        last_updated,
    })
}

/// Copies a resolved local cover into the publish directory and rewrites the
/// item's cover to its public URL. A missing source file demotes the cover
/// to null but keeps the item in the export.
fn publish_cover(vault: &Vault, item: &mut FieldMap) {
    let cfg = vault.config();
    let Some(cover) = item.get("cover").and_then(FieldValue::as_str) else {
        return;
    };
    let cover = cover.trim().to_string();
    if cover.is_empty() {
        item.remove("cover");
        return;
    }

    let source = vault.root().join(&cover);
    let filename = source
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    if !source.exists() || filename.is_empty() {
        warn!(cover, "cover file missing, publishing item without cover");
        item.insert("cover".into(), FieldValue::Null);
        return;
    }

    let publish_dir = &cfg.publish_dir;
    let published = publish_dir.join(&filename);
    let copied = std::fs::create_dir_all(publish_dir)
        .and_then(|_| std::fs::copy(&source, &published).map(|_| ()));
    if let Err(err) = copied {
        warn!(cover, %err, "cover publish failed, publishing item without cover");
        item.insert("cover".into(), FieldValue::Null);
        return;
    }

    let url = format!("{}/{}", cfg.publish_base_url.trim_end_matches('/'), filename);
    item.insert("cover".into(), FieldValue::String(url));
}
