use std::collections::BTreeMap;

use serde_json::Value;

use crate::export::{
    ExportReport, item_to_json, normalize_date_field, scan_category, sort_by_date, write_document,
};
use crate::fields::{FieldDict, FieldMap, FieldValue, translate_fields};
use crate::{Result, Vault};

pub const TIMELINE_CATEGORY: &str = "Timeline";

pub const TIMELINE_DICT: FieldDict = &[
    ("Titel", "title"),
    ("Datum", "date"),
    ("Typ", "type"),
    ("Beschreibung", "description"),
];

fn entry_type(item: &FieldMap) -> String {
    item.get("type")
        .and_then(FieldValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Timeline entries are emitted twice: as one flat chronological sequence
/// and as a map grouped by entry type.
pub fn export_timeline(vault: &Vault) -> Result<ExportReport> {
    let scan = scan_category(vault, TIMELINE_CATEGORY);

    let mut items = Vec::new();
    for note in scan.notes {
        let mut item = translate_fields(&note.fields, TIMELINE_DICT);
        normalize_date_field(&mut item, "date");
        items.push(item);
    }
    sort_by_date(&mut items, "date", false);

    let mut by_type: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for item in &items {
        by_type
            .entry(entry_type(item))
            .or_default()
            .push(item_to_json(item));
    }

    let count = items.len();
    let buckets: Vec<(String, usize)> = by_type.iter().map(|(k, v)| (k.clone(), v.len())).collect();

    let mut content = serde_json::Map::new();
    content.insert(
        "entries".into(),
        Value::Array(items.iter().map(item_to_json).collect()),
    );
    content.insert(
        "byType".into(),
        Value::Object(by_type.into_iter().map(|(k, v)| (k, Value::Array(v))).collect()),
    );

    let (output_path, last_updated) =
        write_document(&vault.config().output_dir, "timeline", content, count)?;

    Ok(ExportReport {
        collection: "timeline",
        output_path,
        count,
        skipped: scan.skipped,
        buckets,
        last_updated,
    })
}
