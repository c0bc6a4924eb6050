//! Untyped field maps produced by the response parser.
//!
//! Entries from different providers arrive in different shapes. The parser
//! only turns them into [`FieldMap`]s; the normalizer is the single place
//! where these become typed [`PaperRecord`](super::PaperRecord)s.

use std::collections::BTreeMap;

use serde_json::Value;

/// One raw field value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawField {
    Text(String),
    Integer(i64),
    List(Vec<String>),
    #[default]
    Absent,
}

impl RawField {
    pub fn is_absent(&self) -> bool {
        matches!(self, RawField::Absent)
    }

    /// Text content, if this is a non-blank text field
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawField::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Text(value.to_string())
    }
}

impl From<String> for RawField {
    fn from(value: String) -> Self {
        RawField::Text(value)
    }
}

impl From<i64> for RawField {
    fn from(value: i64) -> Self {
        RawField::Integer(value)
    }
}

impl From<Vec<String>> for RawField {
    fn from(value: Vec<String>) -> Self {
        RawField::List(value)
    }
}

impl From<&Value> for RawField {
    /// JSON values are mapped loosely: `null` is absent, arrays keep their
    /// string-like members (objects contribute their `name`), objects are
    /// reduced to their `name` member.
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawField::Absent,
            Value::Bool(b) => RawField::Text(b.to_string()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawField::Integer(i),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => RawField::Integer(f as i64),
                    _ => RawField::Text(n.to_string()),
                },
            },
            Value::String(s) => RawField::Text(s.clone()),
            Value::Array(items) => RawField::List(items.iter().filter_map(list_item).collect()),
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .map(|s| RawField::Text(s.to_string()))
                .unwrap_or(RawField::Absent),
        }
    }
}

fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Field name to raw value, as read from one entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<String, RawField>,
}

static ABSENT: RawField = RawField::Absent;

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field (chainable)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawField>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawField>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Field value, [`RawField::Absent`] when missing
    pub fn get(&self, key: &str) -> &RawField {
        self.fields.get(key).unwrap_or(&ABSENT)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build from a JSON object, one field per member
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .map(|(k, v)| (k.clone(), RawField::from(v)))
            .collect();
        Self { fields }
    }
}
