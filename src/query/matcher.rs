//! Query evaluation

use serde_json::Value;

use crate::record::{Document, ALT_ID_FIELD, ID_FIELD};

use super::filter::{Clause, Condition, Query};
use super::value::{loose_eq, text_form};

impl Query {
    /// Does `doc` satisfy every clause?
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses().iter().all(|clause| clause.matches(doc))
    }
}

impl Clause {
    /// Evaluate one clause (combinators short-circuit)
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Clause::Field { path, condition } => condition.test(resolve_path(doc, path)),
            Clause::Or(queries) => queries.iter().any(|q| q.matches(doc)),
            Clause::And(queries) => queries.iter().all(|q| q.matches(doc)),
        }
    }
}

impl Condition {
    /// Test a resolved field value (`None` = no value at that path)
    pub fn test(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Condition::Exists(present), found) => found.is_some() == *present,
            (_, None) => false,
            (Condition::Equals(expected), Some(actual)) => loose_eq(actual, expected),
            (Condition::Pattern(regex), Some(actual)) => {
                text_form(actual).map_or(false, |text| regex.is_match(&text))
            }
        }
    }
}

/// Resolve a dotted path against a document
///
/// Object segments are looked up by key, array segments by numeric index.
/// Any missing step yields `None`.
///
/// A leading `id` segment reads the document's own `id` field when it has
/// one and `_id` otherwise, since ingestion renames `id` to `_id`.
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = match segments.next()? {
        ALT_ID_FIELD if !doc.contains_key(ALT_ID_FIELD) => doc.get(ID_FIELD)?,
        first => doc.get(first)?,
    };

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}
