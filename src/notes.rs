use std::collections::BTreeMap;

use serde_json::Value;

use crate::export::{
    ExportReport, coerce_array_fields, item_to_json, normalize_date_field, scan_category, slugify,
    sort_by_date, write_document,
};
use crate::fields::{FieldDict, FieldMap, FieldValue, translate_fields};
use crate::{Result, Vault};

pub const NOTES_CATEGORY: &str = "Notizen";
const DEFAULT_TOPIC: &str = "Uncategorized";

pub const NOTES_DICT: FieldDict = &[
    ("Thema", "topic"),
    ("Tags", "tags"),
    ("Datum", "date"),
];

fn topic_of(item: &FieldMap) -> String {
    item.get("topic")
        .and_then(FieldValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
}

/// Freeform notes derive their display title from the filename and a
/// URL-safe slug from it; items group by topic, newest first.
pub fn export_notes(vault: &Vault) -> Result<ExportReport> {
    let scan = scan_category(vault, NOTES_CATEGORY);

    let mut items = Vec::new();
    for note in scan.notes {
        let mut item = translate_fields(&note.fields, NOTES_DICT);
        coerce_array_fields(&mut item, &["tags"]);
        normalize_date_field(&mut item, "date");

        let title = note.path.file_stem().to_string();
        item.insert("slug".into(), FieldValue::String(slugify(&title)));
        item.insert("title".into(), FieldValue::String(title));
        items.push(item);
    }
    sort_by_date(&mut items, "date", true);

    // BTreeMap gives ascending alphabetical topic keys.
    let mut topics: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for item in &items {
        topics
            .entry(topic_of(item))
            .or_default()
            .push(item_to_json(item));
    }

    let count = items.len();
    let buckets: Vec<(String, usize)> = topics.iter().map(|(k, v)| (k.clone(), v.len())).collect();

    let mut content = serde_json::Map::new();
    content.insert(
        "topics".into(),
        Value::Object(topics.into_iter().map(|(k, v)| (k, Value::Array(v))).collect()),
    );

    let (output_path, last_updated) =
        write_document(&vault.config().output_dir, "notes", content, count)?;

    Ok(ExportReport {
        collection: "notes",
        output_path,
        count,
        skipped: scan.skipped,
        buckets,
        last_updated,
    })
}
