//! Record Module
//!
//! Documents, identifiers, timestamps and the `Record` handle.
//!
//! ## Responsibilities
//! - Canonicalize identifiers at ingestion (`id` → `_id`)
//! - Generate identifiers for records created without one
//! - Stamp `createdAt` / `updatedAt`
//! - Pair a fetched document with the collection that can persist it

mod handle;
mod lifecycle;

pub use handle::Record;
pub use lifecycle::{
    document_from_json, generate_id, id_key, id_of, ids_equal, normalize_id, now_timestamp,
    stamp_created, stamp_updated,
};

/// A stored document: field name → JSON value, in insertion order
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Canonical identifier field
pub const ID_FIELD: &str = "_id";

/// Alternate identifier spelling accepted at ingestion
pub const ALT_ID_FIELD: &str = "id";

/// Creation timestamp field (store-managed)
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Last-mutation timestamp field (store-managed)
pub const UPDATED_AT_FIELD: &str = "updatedAt";
