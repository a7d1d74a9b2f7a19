//! Identifier and timestamp helpers

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FlatDocError, Result};
use crate::query::loose_eq;

use super::{Document, ALT_ID_FIELD, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

/// Generate a fresh record identifier (32 lowercase hex chars)
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current time as an ISO-8601 UTC string with millisecond precision
///
/// e.g. `2024-05-01T09:30:00.123Z`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Move an `id` field to `_id` when the document has no `_id`
///
/// A document carrying both keeps both; `_id` is authoritative.
pub fn normalize_id(doc: &mut Document) {
    if doc.contains_key(ID_FIELD) {
        return;
    }
    if let Some(id) = doc.remove(ALT_ID_FIELD) {
        // Keep _id as the first field, as it would be for generated ids
        let rest = std::mem::take(doc);
        doc.insert(ID_FIELD.to_string(), id);
        doc.extend(rest);
    }
}

/// Assign an identifier if absent and set both timestamps
pub fn stamp_created(doc: &mut Document) {
    normalize_id(doc);
    if matches!(doc.get(ID_FIELD), None | Some(Value::Null)) {
        let rest = std::mem::take(doc);
        doc.insert(ID_FIELD.to_string(), Value::String(generate_id()));
        doc.extend(rest.into_iter().filter(|(k, _)| k != ID_FIELD));
    }

    let now = now_timestamp();
    doc.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
    doc.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));
}

/// Refresh `updatedAt`
pub fn stamp_updated(doc: &mut Document) {
    doc.insert(
        UPDATED_AT_FIELD.to_string(),
        Value::String(now_timestamp()),
    );
}

/// The document's canonical identifier, if any
pub fn id_of(doc: &Document) -> Option<&Value> {
    match doc.get(ID_FIELD) {
        Some(Value::Null) | None => None,
        Some(id) => Some(id),
    }
}

/// Comparable text form of an identifier
///
/// Strings, numbers and booleans map to their text; `{"$oid": "..."}`
/// maps to the inner string. Anything else has no key.
pub fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        },
        Value::Null | Value::Array(_) => None,
    }
}

/// Take a JSON object as a document
pub fn document_from_json(value: Value) -> Result<Document> {
    match value {
        Value::Object(doc) => Ok(doc),
        other => Err(FlatDocError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Identifier equality tolerant of string/number drift (`42` == `"42"`)
///
/// Uses the same rule as literal query conditions, so a lookup by id and a
/// query on `_id` always agree. Ids without a key form never match.
pub fn ids_equal(a: &Value, b: &Value) -> bool {
    id_key(a).is_some() && id_key(b).is_some() && loose_eq(a, b)
}
