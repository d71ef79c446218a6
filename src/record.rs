//! Export records and their structured sub-fields
//!
//! A record is one decoded JSON object. Lookups are explicit `Option`s:
//! an absent key and a JSON `null` both mean "no value", which the flattener
//! turns into a blank cell.

use crate::error::{ConvertError, Result};
use serde_json::{Map, Value};

/// Typed-value slots, in resolution precedence order
pub const TYPED_SLOTS: [&str; 5] = [
    "string_value",
    "set_timestamp_micros",
    "int_value",
    "float_value",
    "double_value",
];

/// One decoded export record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Wrap a decoded JSON value; only objects are records
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    /// Top-level field names in document order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Raw value of a top-level field; `null` counts as absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Rendered cell text of a top-level field
    pub fn scalar(&self, name: &str) -> Option<String> {
        self.get(name).map(render_scalar)
    }

    /// Entries of a keyed group; missing, null or non-list groups yield nothing
    pub fn keyed_entries<'a>(&'a self, group: &str) -> impl Iterator<Item = KeyedEntry<'a>> {
        self.get(group)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(KeyedEntry::from_value)
    }

    /// Sub-object of a fixed group, if present
    pub fn fixed_object(&self, group: &str) -> Option<&Map<String, Value>> {
        self.get(group).and_then(Value::as_object)
    }

    /// First of `required` this record lacks (absent, null or structured)
    pub fn missing_field<'f>(&self, required: &[&'f str]) -> Option<&'f str> {
        required.iter().copied().find(|name| {
            !matches!(
                self.get(name),
                Some(Value::String(_)) | Some(Value::Number(_)) | Some(Value::Bool(_))
            )
        })
    }
}

/// One `{ "key": .., "value": { .. } }` entry of a keyed group
#[derive(Debug, Clone, Copy)]
pub struct KeyedEntry<'a> {
    pub key: &'a str,
    pub value: Option<TypedValue<'a>>,
}

impl<'a> KeyedEntry<'a> {
    fn from_value(entry: &'a Value) -> Option<Self> {
        let key = entry.get("key").and_then(Value::as_str);
        let Some(key) = key else {
            tracing::debug!("Skipping keyed entry without a string key: {}", entry);
            return None;
        };

        Some(Self {
            key,
            value: entry
                .get("value")
                .and_then(Value::as_object)
                .map(TypedValue::new),
        })
    }

    /// Cell text for this entry (see [`TypedValue::resolve`])
    pub fn resolve(&self) -> Option<String> {
        self.value.as_ref().and_then(TypedValue::resolve)
    }
}

/// Borrowed view over the typed slots of a keyed entry's value
#[derive(Debug, Clone, Copy)]
pub struct TypedValue<'a> {
    slots: &'a Map<String, Value>,
}

impl<'a> TypedValue<'a> {
    pub fn new(slots: &'a Map<String, Value>) -> Self {
        Self { slots }
    }

    /// First non-null slot in [`TYPED_SLOTS`] order.
    ///
    /// A string value always beats the numeric slots, so a tag carrying both
    /// never surfaces its number.
    pub fn resolve(&self) -> Option<String> {
        TYPED_SLOTS
            .iter()
            .filter_map(|slot| self.slots.get(*slot))
            .find(|v| !v.is_null())
            .map(render_scalar)
    }
}

/// Cell text of a JSON value
///
/// Strings are verbatim, numbers and bools in JSON form, null is empty and
/// nested containers are compact JSON.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Fail on the first record lacking any of `required`
pub fn validate_required(records: &[Record], required: &[&str]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        if let Some(field) = record.missing_field(required) {
            return Err(ConvertError::MissingField {
                index,
                field: field.to_string(),
            });
        }
    }
    Ok(())
}
