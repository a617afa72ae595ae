//! Normalized article records.
//!
//! Normalization stops at a JSON-like structure: each provider keeps its own
//! field names, so an [`Article`] is a plain [`serde_json::Value`]. The XML
//! providers are parsed into the same shape (see [`crate::utils::parse_xml`]).

use serde_json::Value;

/// A provider-specific record, owned for the duration of one request
pub type Article = Value;

/// Key under which XML text content is stored when an element also has
/// attributes or children.
pub const TEXT_KEY: &str = "text";

/// Normalize a "one or many" field to a list.
///
/// JSON providers and the XML parser both collapse single-element lists to
/// the element itself; `null`/missing becomes an empty list.
pub fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Scalar text of a value.
///
/// Handles plain strings and numbers, Scopus `{"$": "..."}` wrappers, and
/// XML elements with attributes (`{"text": "..."}`).
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map
            .get("$")
            .or_else(|| map.get(TEXT_KEY))
            .and_then(text_of),
        _ => None,
    }
}

/// Text of a field of an object
pub fn field_text(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(text_of)
}
