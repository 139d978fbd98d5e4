use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// One frontmatter value, normalized from YAML.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// Source-key → output-key pairs; the allow-list contract of an exporter.
pub type FieldDict = &'static [(&'static str, &'static str)];

static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]*)\]\]").expect("valid regex"));

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Int(n) => serde_json::Value::from(*n),
            FieldValue::Float(n) => {
                serde_json::Number::from_f64(*n).map_or(serde_json::Value::Null, Into::into)
            }
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
        }
    }
}

pub fn yaml_to_field_value(v: &serde_yaml::Value) -> FieldValue {
    match v {
        serde_yaml::Value::Null => FieldValue::Null,
        serde_yaml::Value::Bool(b) => FieldValue::Bool(*b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_yaml::Value::String(s) => FieldValue::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            FieldValue::List(seq.iter().map(yaml_to_field_value).collect())
        }
        // Nested mappings never carry exportable data in this corpus.
        serde_yaml::Value::Mapping(_) => FieldValue::Null,
        serde_yaml::Value::Tagged(tagged) => yaml_to_field_value(&tagged.value),
    }
}

pub fn field_map_from_metadata(metadata: &serde_yaml::Mapping) -> FieldMap {
    let mut out = FieldMap::new();
    for (k, v) in metadata {
        let Some(key) = k.as_str() else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        out.insert(key.to_string(), yaml_to_field_value(v));
    }
    out
}

/// Strips wiki-style cross-reference brackets, keeping the inner text:
/// `"[[X]]"` becomes `"X"`. Recurses into lists; other values pass through.
pub fn clean_links(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::String(s) => FieldValue::String(WIKILINK.replace_all(s, "$1").into_owned()),
        FieldValue::List(items) => FieldValue::List(items.iter().map(clean_links).collect()),
        other => other.clone(),
    }
}

/// Missing/empty → empty sequence; list → element-wise cleaned; scalar →
/// singleton cleaned sequence.
pub fn normalize_to_array(value: Option<&FieldValue>) -> Vec<FieldValue> {
    match value {
        None => Vec::new(),
        Some(v) if v.is_empty() => Vec::new(),
        Some(FieldValue::List(items)) => items.iter().map(clean_links).collect(),
        Some(scalar) => vec![clean_links(scalar)],
    }
}

/// Translates a metadata map through an allow-list dictionary. Keys absent
/// from the dictionary are dropped; source keys with no value emit nothing.
pub fn translate_fields(map: &FieldMap, dict: FieldDict) -> FieldMap {
    let mut out = FieldMap::new();
    for (source, target) in dict {
        if let Some(v) = map.get(*source) {
            out.insert((*target).to_string(), clean_links(v));
        }
    }
    out
}

/// Category membership: true when any cleaned category element contains
/// `term` as a substring. A scalar category is treated as a one-element
/// list, so compound labels like `[[Serien/Drama]]` still match `Serien`.
pub fn belongs_to(map: &FieldMap, category_key: &str, term: &str) -> bool {
    normalize_to_array(map.get(category_key))
        .iter()
        .any(|v| v.as_str().is_some_and(|s| s.contains(term)))
}
