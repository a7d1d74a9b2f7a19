//! Query definitions
//!
//! A query is a list of clauses that must all hold.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::error::{FlatDocError, Result};
use crate::record::Document;

/// A document predicate (implicit AND of its clauses)
///
/// An empty query matches every document.
#[derive(Debug, Clone, Default)]
pub struct Query {
    clauses: Vec<Clause>,
}

/// One element of a query
#[derive(Debug, Clone)]
pub enum Clause {
    /// Test the value found at a dotted field path
    Field { path: String, condition: Condition },

    /// At least one sub-query matches (`$or`)
    Or(Vec<Query>),

    /// Every sub-query matches (`$and`)
    And(Vec<Query>),
}

/// What a field value must satisfy
#[derive(Debug, Clone)]
pub enum Condition {
    /// Flexible equality with a literal
    Equals(Value),

    /// Regular expression over the value's text form
    Pattern(Regex),

    /// Field presence (`true`) or absence (`false`)
    Exists(bool),
}

impl Condition {
    /// Compile a pattern condition
    pub fn pattern(pattern: &str, case_insensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| FlatDocError::InvalidQuery(format!("bad pattern '{}': {}", pattern, e)))?;
        Ok(Condition::Pattern(regex))
    }
}

impl Query {
    /// Create an empty query (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for [`Query::new`]
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `path` to equal `value` (flexible equality)
    pub fn eq(self, path: &str, value: impl Into<Value>) -> Self {
        self.with_condition(path, Condition::Equals(value.into()))
    }

    /// Require `path` to match `regex`
    pub fn pattern(self, path: &str, regex: Regex) -> Self {
        self.with_condition(path, Condition::Pattern(regex))
    }

    /// Require `path` to be present or absent
    pub fn exists(self, path: &str, present: bool) -> Self {
        self.with_condition(path, Condition::Exists(present))
    }

    /// Add an arbitrary field condition
    pub fn with_condition(mut self, path: &str, condition: Condition) -> Self {
        self.clauses.push(Clause::Field {
            path: path.to_string(),
            condition,
        });
        self
    }

    /// Require at least one of `queries` to match
    pub fn or(mut self, queries: Vec<Query>) -> Self {
        self.clauses.push(Clause::Or(queries));
        self
    }

    /// Require every one of `queries` to match
    pub fn and(mut self, queries: Vec<Query>) -> Self {
        self.clauses.push(Clause::And(queries));
        self
    }

    /// True when the query has no clauses
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Get the clauses
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Parse the JSON query grammar
    ///
    /// `null` is accepted as the empty query.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Self::from_map(map),
            other => Err(FlatDocError::InvalidQuery(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// The literal equality fields of this query laid out as a document
    ///
    /// Dotted paths become nested objects. Patterns, presence tests and
    /// combinators contribute nothing; `$and` sub-queries are folded in.
    pub fn seed_document(&self) -> Document {
        let mut doc = Document::new();
        self.fill_seed(&mut doc);
        doc
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut query = Self::new();

        for (key, value) in map {
            match key.as_str() {
                "$or" => query.clauses.push(Clause::Or(Self::parse_list(key, value)?)),
                "$and" => query.clauses.push(Clause::And(Self::parse_list(key, value)?)),
                op if op.starts_with('$') => {
                    return Err(FlatDocError::InvalidQuery(format!(
                        "unsupported operator '{}'",
                        op
                    )));
                }
                path => {
                    for condition in Self::parse_conditions(path, value)? {
                        query = query.with_condition(path, condition);
                    }
                }
            }
        }

        Ok(query)
    }

    fn parse_list(key: &str, value: &Value) -> Result<Vec<Query>> {
        match value {
            Value::Array(items) => items.iter().map(Self::from_json).collect(),
            other => Err(FlatDocError::InvalidQuery(format!(
                "'{}' expects an array of queries, got {}",
                key, other
            ))),
        }
    }

    /// `{"$regex": ..}` style objects become operator conditions; any other
    /// value is a literal
    fn parse_conditions(path: &str, value: &Value) -> Result<Vec<Condition>> {
        let ops = match value {
            Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
            literal => return Ok(vec![Condition::Equals(literal.clone())]),
        };

        // {"$oid": ".."} is an identifier literal, not an operator
        if ops.contains_key("$oid") {
            return Ok(vec![Condition::Equals(value.clone())]);
        }

        let mut conditions = Vec::with_capacity(ops.len());
        for (op, arg) in ops {
            match op.as_str() {
                "$eq" => conditions.push(Condition::Equals(arg.clone())),
                "$exists" => match arg {
                    Value::Bool(present) => conditions.push(Condition::Exists(*present)),
                    other => {
                        return Err(FlatDocError::InvalidQuery(format!(
                            "'$exists' on '{}' expects a boolean, got {}",
                            path, other
                        )))
                    }
                },
                "$regex" => {
                    let pattern = arg.as_str().ok_or_else(|| {
                        FlatDocError::InvalidQuery(format!(
                            "'$regex' on '{}' expects a string",
                            path
                        ))
                    })?;
                    let flags = match ops.get("$options") {
                        None => "",
                        Some(Value::String(flags)) => flags.as_str(),
                        Some(other) => {
                            return Err(FlatDocError::InvalidQuery(format!(
                                "'$options' on '{}' expects a string, got {}",
                                path, other
                            )))
                        }
                    };
                    conditions.push(Self::compile_pattern(pattern, flags)?);
                }
                "$options" if ops.contains_key("$regex") => {}
                other => {
                    return Err(FlatDocError::InvalidQuery(format!(
                        "unsupported operator '{}' on '{}'",
                        other, path
                    )))
                }
            }
        }

        Ok(conditions)
    }

    fn compile_pattern(pattern: &str, flags: &str) -> Result<Condition> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(FlatDocError::InvalidQuery(format!(
                        "unsupported pattern flag '{}'",
                        other
                    )))
                }
            };
        }
        let regex = builder
            .build()
            .map_err(|e| FlatDocError::InvalidQuery(format!("bad pattern '{}': {}", pattern, e)))?;
        Ok(Condition::Pattern(regex))
    }

    fn fill_seed(&self, doc: &mut Document) {
        for clause in &self.clauses {
            match clause {
                Clause::Field {
                    path,
                    condition: Condition::Equals(value),
                } => set_path(doc, path, value.clone()),
                Clause::And(queries) => queries.iter().for_each(|q| q.fill_seed(doc)),
                _ => {}
            }
        }
    }
}

impl TryFrom<Value> for Query {
    type Error = FlatDocError;

    fn try_from(value: Value) -> Result<Self> {
        Query::from_json(&value)
    }
}

impl TryFrom<&Value> for Query {
    type Error = FlatDocError;

    fn try_from(value: &Value) -> Result<Self> {
        Query::from_json(value)
    }
}

/// Write `value` at a dotted path, creating intermediate objects
fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                set_path(map, rest, value);
            }
        }
    }
}
