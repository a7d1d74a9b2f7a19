//! Query Module
//!
//! Predicates over documents and result ordering.
//!
//! ## Query Grammar (JSON)
//! ```text
//! {
//!   "status": "Shipped",                          literal (flexible equality)
//!   "customer.email": {"$regex": "^a@", "$options": "i"},   pattern
//!   "deletedAt": {"$exists": false},              presence test
//!   "$or":  [ {...}, {...} ],                      any sub-query matches
//!   "$and": [ {...}, {...} ]                       every sub-query matches
//! }
//! ```
//! Top-level keys are ANDed. Field paths are dot-separated; a numeric
//! segment indexes into an array.
//!
//! ## Flexible Equality
//! Literal conditions compare with [`loose_eq`]: identical JSON values are
//! equal, and so are a number and a string spelling the same number
//! (`42` ≡ `"42"`), a boolean and its text (`true` ≡ `"true"`), and an
//! `{"$oid": s}` wrapper and `s`. Arrays and objects compare element-wise
//! with the same rule. A missing field never equals anything.
//!
//! ## Sort Grammar (JSON)
//! `{"createdAt": -1, "title": 1}` is applied key by key, in key order.

mod filter;
mod matcher;
mod sort;
mod value;

pub use filter::{Clause, Condition, Query};
pub use matcher::resolve_path;
pub use sort::{SortDirection, SortSpec};
pub use value::{compare_values, loose_eq, text_form};
