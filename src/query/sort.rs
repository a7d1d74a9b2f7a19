//! Sort specifications

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{FlatDocError, Result};
use crate::record::Document;

use super::matcher::resolve_path;
use super::value::compare_values;

/// Sort direction for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordered list of sort keys; later keys break ties of earlier ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<(String, SortDirection)>,
}

impl SortSpec {
    /// Create an empty spec (keeps the input order)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ascending key
    pub fn asc(mut self, path: &str) -> Self {
        self.keys.push((path.to_string(), SortDirection::Ascending));
        self
    }

    /// Append a descending key
    pub fn desc(mut self, path: &str) -> Self {
        self.keys.push((path.to_string(), SortDirection::Descending));
        self
    }

    /// Parse `{"field": 1 | -1 | "asc" | "desc", ...}` in key order
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            FlatDocError::InvalidQuery(format!("sort spec must be an object, got {}", value))
        })?;

        let mut spec = Self::new();
        for (path, direction) in map {
            let direction = match direction {
                Value::Number(n) if n.as_f64() == Some(1.0) => SortDirection::Ascending,
                Value::Number(n) if n.as_f64() == Some(-1.0) => SortDirection::Descending,
                Value::String(s) if s.eq_ignore_ascii_case("asc") => SortDirection::Ascending,
                Value::String(s) if s.eq_ignore_ascii_case("desc") => SortDirection::Descending,
                other => {
                    return Err(FlatDocError::InvalidQuery(format!(
                        "sort direction for '{}' must be 1 or -1, got {}",
                        path, other
                    )))
                }
            };
            spec.keys.push((path.clone(), direction));
        }

        Ok(spec)
    }

    /// Get the keys in evaluation order
    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    /// True when no keys are set
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compare two documents key by key
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (path, direction) in &self.keys {
            let ord = compare_values(resolve_path(a, path), resolve_path(b, path));
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort
    pub fn sort(&self, docs: &mut [Document]) {
        if !self.keys.is_empty() {
            docs.sort_by(|a, b| self.compare(a, b));
        }
    }
}
