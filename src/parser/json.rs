//! JSON search payloads of the form `{"total": .., "data": [ {..}, .. ]}`.

use serde_json::Value;

use super::ParseError;
use crate::models::FieldMap;

pub(super) struct JsonEntries {
    entries: std::iter::Enumerate<std::vec::IntoIter<Value>>,
}

impl JsonEntries {
    pub(super) fn new(payload: &[u8]) -> Result<Self, ParseError> {
        let document: Value = serde_json::from_slice(payload)
            .map_err(|e| ParseError::Document(format!("invalid JSON: {}", e)))?;

        let entries = match document {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(ParseError::Document(format!(
                        "expected `data` to be an array, found {}",
                        kind(&other)
                    )))
                }
            },
            // a bare array of entries is accepted as well
            Value::Array(items) => items,
            other => {
                return Err(ParseError::Document(format!(
                    "expected an object, found {}",
                    kind(&other)
                )))
            }
        };

        Ok(Self {
            entries: entries.into_iter().enumerate(),
        })
    }
}

impl Iterator for JsonEntries {
    type Item = Result<FieldMap, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, value) = self.entries.next()?;
        Some(match value {
            Value::Object(map) => Ok(FieldMap::from_json_object(&map)),
            other => Err(ParseError::Entry {
                index,
                reason: format!("expected an object, found {}", kind(&other)),
            }),
        })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
