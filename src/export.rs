use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::fields::{
    FieldMap, FieldValue, belongs_to, clean_links, field_map_from_metadata, normalize_to_array,
};
use crate::frontmatter::read_note;
use crate::{Error, Result, Vault, VaultPath};

/// One note that survived parsing and the category filter.
#[derive(Debug, Clone)]
pub struct ScannedNote {
    pub path: VaultPath,
    pub fields: FieldMap,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusScan {
    pub notes: Vec<ScannedNote>,
    /// Notes that parsed, regardless of category.
    pub processed: usize,
    /// Notes skipped because their frontmatter would not parse.
    pub skipped: usize,
}

/// Summary of one export pass, printed by the driver.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub collection: &'static str,
    pub output_path: PathBuf,
    pub count: usize,
    pub skipped: usize,
    pub buckets: Vec<(String, usize)>,
    pub last_updated: String,
}

/// Walks the corpus and collects all notes in `category_term`. A note whose
/// frontmatter fails to parse is logged and skipped; the scan never aborts.
pub fn scan_category(vault: &Vault, category_term: &str) -> CorpusScan {
    let mut scan = CorpusScan::default();
    let category_key = vault.config().category_key.clone();

    for rel in vault.note_paths() {
        let abs = vault.to_abs(&rel);
        let note = match read_note(&abs) {
            Ok(n) => n,
            Err(err) => {
                warn!(path = rel.as_str_lossy(), %err, "skipping unparseable note");
                scan.skipped += 1;
                continue;
            }
        };
        scan.processed += 1;

        let fields = field_map_from_metadata(&note.metadata);
        if !belongs_to(&fields, &category_key, category_term) {
            continue;
        }
        scan.notes.push(ScannedNote { path: rel, fields });
    }

    debug!(
        category = category_term,
        matched = scan.notes.len(),
        processed = scan.processed,
        skipped = scan.skipped,
        "corpus scan complete"
    );
    scan
}

// ---- type-specific coercions --------------------------------------------

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{4}-\d{2}-\d{2}$").expect("valid regex"));

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Appends a midnight-UTC time component to plain dates. The fixed-width
/// pattern keeps signed years (e.g. `-0500-01-01`) working where a general
/// date parser would reject them; anything else passes through unchanged.
pub fn normalize_date(raw: &str) -> String {
    if DATE_PATTERN.is_match(raw) {
        format!("{raw}T00:00:00.000Z")
    } else {
        raw.to_string()
    }
}

pub fn normalize_date_field(item: &mut FieldMap, key: &str) {
    if let Some(FieldValue::String(s)) = item.get(key) {
        let normalized = normalize_date(s);
        item.insert(key.to_string(), FieldValue::String(normalized));
    }
}

/// Parses a string field as an integer; an unparseable value stays a string.
pub fn coerce_int_field(item: &mut FieldMap, key: &str) {
    if let Some(FieldValue::String(s)) = item.get(key) {
        if let Ok(n) = s.trim().parse::<i64>() {
            item.insert(key.to_string(), FieldValue::Int(n));
        }
    }
}

/// Parses a string field as a float; an unparseable value stays a string.
pub fn coerce_float_field(item: &mut FieldMap, key: &str) {
    if let Some(FieldValue::String(s)) = item.get(key) {
        if let Ok(n) = s.trim().parse::<f64>() {
            item.insert(key.to_string(), FieldValue::Float(n));
        }
    }
}

/// Wraps scalar values of declared always-array fields in a singleton list.
pub fn coerce_array_fields(item: &mut FieldMap, keys: &[&str]) {
    for key in keys {
        if let Some(v) = item.get(*key) {
            if !v.is_empty() && !matches!(v, FieldValue::List(_)) {
                let wrapped = FieldValue::List(vec![clean_links(v)]);
                item.insert((*key).to_string(), wrapped);
            }
        }
    }
}

/// Replaces a status-like field with its normalized ordered sequence.
pub fn coerce_status_field(item: &mut FieldMap, key: &str) {
    if let Some(v) = item.get(key) {
        let seq = normalize_to_array(Some(v));
        item.insert(key.to_string(), FieldValue::List(seq));
    }
}

/// Lowercases and collapses any run of non-alphanumerics to one hyphen.
pub fn slugify(raw: &str) -> String {
    NON_ALNUM
        .replace_all(&raw.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

// ---- grouping and sorting -----------------------------------------------

/// German status vocabulary shared by the status-bearing collections. The
/// first three keep flat buckets; `Abgeschlossen` is sub-grouped by year.
pub const OPEN_STATUSES: [(&str, &str); 3] = [
    ("Lesen", "lesen"),
    ("Geplant", "geplant"),
    ("Abgebrochen", "abgebrochen"),
];
pub const DONE_STATUS: (&str, &str) = ("Abgeschlossen", "abgeschlossen");

fn first_status(item: &FieldMap, status_key: &str) -> Option<String> {
    match item.get(status_key) {
        Some(FieldValue::List(items)) => items.first().and_then(|v| v.as_str()).map(String::from),
        Some(v) => v.as_str().map(String::from),
        None => None,
    }
}

fn year_of(item: &FieldMap, date_key: &str) -> String {
    static YEAR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(-?\d{4})").expect("valid regex"));
    item.get(date_key)
        .and_then(FieldValue::as_str)
        .and_then(|s| YEAR.captures(s))
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn date_key_of(item: &FieldMap, key: &str) -> Option<String> {
    item.get(key)
        .and_then(FieldValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Sorts items by a date field. Missing or empty dates sort last in both
/// directions; string comparison is sufficient for the normalized format.
pub fn sort_by_date(items: &mut [FieldMap], key: &str, descending: bool) {
    items.sort_by(|a, b| {
        let da = date_key_of(a, key);
        let db = date_key_of(b, key);
        match (da, db) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(x), Some(y)) => {
                if descending {
                    y.cmp(&x)
                } else {
                    x.cmp(&y)
                }
            }
        }
    });
}

pub fn item_to_json(item: &FieldMap) -> Value {
    let mut out = serde_json::Map::new();
    for (k, v) in item {
        out.insert(k.clone(), v.to_json());
    }
    Value::Object(out)
}

/// Buckets items by the first element of their status sequence: three flat
/// lists plus a by-year map for the terminal status. Within every bucket,
/// items sort by `date_key` descending; year keys iterate descending.
pub fn group_by_status(
    mut items: Vec<FieldMap>,
    status_key: &str,
    date_key: &str,
) -> (serde_json::Map<String, Value>, Vec<(String, usize)>, usize) {
    sort_by_date(&mut items, date_key, true);

    let mut open: BTreeMap<&str, Vec<FieldMap>> = BTreeMap::new();
    let mut done: BTreeMap<String, Vec<FieldMap>> = BTreeMap::new();
    let mut placed = 0usize;

    for item in items {
        let status = first_status(&item, status_key);
        match status.as_deref() {
            Some(s) if s == DONE_STATUS.0 => {
                let year = year_of(&item, date_key);
                done.entry(year).or_default().push(item);
                placed += 1;
            }
            Some(s) if OPEN_STATUSES.iter().any(|(label, _)| *label == s) => {
                let (_, bucket) = OPEN_STATUSES
                    .iter()
                    .find(|(label, _)| *label == s)
                    .expect("matched above");
                open.entry(*bucket).or_default().push(item);
                placed += 1;
            }
            other => {
                warn!(status = ?other, "item with unknown status left unbucketed");
            }
        }
    }

    let mut groups = serde_json::Map::new();
    let mut bucket_counts = Vec::new();

    for (_, bucket) in OPEN_STATUSES {
        let list = open.remove(bucket).unwrap_or_default();
        bucket_counts.push((bucket.to_string(), list.len()));
        groups.insert(
            bucket.to_string(),
            Value::Array(list.iter().map(item_to_json).collect()),
        );
    }

    let mut by_year = serde_json::Map::new();
    let mut done_total = 0usize;
    for (year, list) in done.iter().rev() {
        done_total += list.len();
        by_year.insert(
            year.clone(),
            Value::Array(list.iter().map(item_to_json).collect()),
        );
    }
    bucket_counts.push((DONE_STATUS.1.to_string(), done_total));
    groups.insert(DONE_STATUS.1.to_string(), Value::Object(by_year));

    (groups, bucket_counts, placed)
}

// ---- persistence ---------------------------------------------------------

fn content_without_meta(doc: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    let mut out = doc.clone();
    out.remove("lastUpdated");
    out.remove("count");
    out
}

/// Persists a pretty-printed output document. The `lastUpdated` stamp is
/// reused from the previous document when the grouped content (everything
/// except `lastUpdated`/`count`) is deeply equal, so regeneration without
/// data changes does not perturb downstream change detection.
pub fn write_document(
    output_dir: &Path,
    name: &str,
    content: serde_json::Map<String, Value>,
    count: usize,
) -> Result<(PathBuf, String)> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
    let path = output_dir.join(format!("{name}.json"));

    let previous: Option<serde_json::Map<String, Value>> = std::fs::read_to_string(&path)
        .ok()
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .and_then(|v| v.as_object().cloned());

    let last_updated = match &previous {
        Some(prev) if content_without_meta(prev) == content => {
            let stamp = prev
                .get("lastUpdated")
                .and_then(Value::as_str)
                .map(String::from);
            match stamp {
                Some(s) => {
                    debug!(path = %path.display(), "content unchanged, keeping timestamp");
                    s
                }
                None => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }
        }
        _ => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let mut doc = serde_json::Map::new();
    doc.insert("lastUpdated".into(), Value::String(last_updated.clone()));
    doc.insert("count".into(), Value::from(count as u64));
    doc.extend(content);

    let pretty =
        serde_json::to_string_pretty(&Value::Object(doc)).map_err(|e| Error::json(&path, e))?;
    std::fs::write(&path, format!("{pretty}\n")).map_err(|e| Error::io(&path, e))?;

    info!(path = %path.display(), count, "wrote export document");
    Ok((path, last_updated))
}
