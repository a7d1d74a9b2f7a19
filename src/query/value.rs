//! Value comparison rules shared by matching and sorting

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// Flexible equality used by literal query conditions
pub fn loose_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            number_matches_text(n, s)
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s == if *b { "true" } else { "false" }
        }
        (Value::Object(o), Value::String(s)) | (Value::String(s), Value::Object(o)) => {
            matches!(o.get("$oid"), Some(Value::String(oid)) if oid == s)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => objects_equal(a, b),
        _ => actual == expected,
    }
}

/// Text used when a pattern is tested against a value
///
/// Arrays, objects and null have no text form and never match a pattern.
pub fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Total order over optional values
///
/// Missing < null < bool < number < string < array < object. Within a
/// type: numeric, lexicographic, or element-wise; objects of equal rank
/// compare equal.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank_order = rank(a).cmp(&rank(b));
    if rank_order != Ordering::Equal {
        return rank_order;
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (Numeric::of(x), Numeric::of(y)) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => Ordering::Equal,
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (Numeric::of(a), Numeric::of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn number_matches_text(n: &Number, s: &str) -> bool {
    match (Numeric::of(n), Numeric::parse(s)) {
        (Some(own), Some(parsed)) => own == parsed,
        _ => false,
    }
}

/// A number reduced to a comparable form
///
/// Integers compare exactly; only fractional values go through `f64`, so
/// ids past 2^53 never collide.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn of(n: &Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            return Some(Numeric::Int(i128::from(i)));
        }
        if let Some(u) = n.as_u64() {
            return Some(Numeric::Int(i128::from(u)));
        }
        n.as_f64().map(Numeric::Float)
    }

    /// Integer text parses exactly; anything else must be a finite float
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(i) = text.parse::<i128>() {
            return Some(Numeric::Int(i));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Numeric::Float)
    }

    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    fn cmp(self, other: Self) -> Ordering {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        }
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            (Numeric::Float(a), Numeric::Float(b)) => a == b,
            (Numeric::Int(i), Numeric::Float(f)) | (Numeric::Float(f), Numeric::Int(i)) => {
                // i128 holds every integral f64 below 1e38 exactly
                f.fract() == 0.0 && f.abs() < 1e38 && f as i128 == i
            }
        }
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).map_or(false, |other| loose_eq(v, other)))
}
