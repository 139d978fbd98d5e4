use crate::export::{
    ExportReport, coerce_array_fields, coerce_float_field, coerce_int_field, coerce_status_field,
    group_by_status, normalize_date_field, scan_category, write_document,
};
use crate::fields::{FieldDict, translate_fields};
use crate::{Result, Vault};

pub const SERIES_CATEGORY: &str = "Serien";

pub const SERIES_DICT: FieldDict = &[
    ("Titel", "title"),
    ("Genre", "genre"),
    ("Besetzung", "cast"),
    ("Staffeln", "seasons"),
    ("Bewertung", "rating"),
    ("Status", "status"),
    ("Gestartet", "started"),
    ("Beendet", "finished"),
];

pub fn export_series(vault: &Vault) -> Result<ExportReport> {
    let scan = scan_category(vault, SERIES_CATEGORY);

    let mut items = Vec::new();
    for note in scan.notes {
        let mut item = translate_fields(&note.fields, SERIES_DICT);
        coerce_status_field(&mut item, "status");
        coerce_array_fields(&mut item, &["genre", "cast"]);
        coerce_int_field(&mut item, "seasons");
        coerce_float_field(&mut item, "rating");
        normalize_date_field(&mut item, "started");
        normalize_date_field(&mut item, "finished");
        items.push(item);
    }

    let count = items.len();
    let (groups, buckets, _) = group_by_status(items, "status", "finished");
    let (output_path, last_updated) =
        write_document(&vault.config().output_dir, "series", groups, count)?;

    Ok(ExportReport {
        collection: "series",
        output_path,
        count,
        skipped: scan.skipped,
        buckets,
        last_updated,
    })
}
