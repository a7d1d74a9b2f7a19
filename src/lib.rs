//! # flatdoc
//!
//! An embedded document store that keeps each collection in one JSON file:
//! - Query/update surface in the style of a document database
//!   (find, chainable cursors, atomic transforms, upserts)
//! - Per-collection FIFO serialization of every operation
//! - Whole-file atomic rewrites (temp file + rename)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Collection (facade)                         │
//! │   create / find / update_* / delete_*  →  Record, Cursor     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one job per call
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Serial Queue                                │
//! │         (one FIFO lane + worker thread per collection)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Collection  │          │   Query     │
//!   │   Store     │          │  Matcher /  │
//!   │ (JSON file) │          │   Sort      │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use flatdoc::{Database, Query, SortSpec, Update};
//! use serde_json::json;
//!
//! # fn main() -> flatdoc::Result<()> {
//! let db = Database::open_path(std::path::Path::new("./data"))?;
//! let orders = db.collection("orders")?;
//!
//! let order = orders.create(flatdoc::record::document_from_json(json!({
//!     "orderId": "A-1", "status": "Pending", "customer": {"email": "a@b.c"}
//! }))?)?;
//!
//! let mine = orders
//!     .find(Query::new().eq("customer.email", "a@b.c"))
//!     .sort(SortSpec::new().desc("createdAt"))
//!     .limit(10)
//!     .resolve()?;
//! assert_eq!(mine.len(), 1);
//!
//! orders.update_by_id(order.id().unwrap(), Update::transform(|mut doc| {
//!     doc.insert("status".into(), json!("Shipped"));
//!     doc
//! }))?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod queue;
pub mod store;
pub mod query;
pub mod record;
pub mod cursor;
pub mod collection;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlatDocError, Result};
pub use config::{Config, CorruptionPolicy};
pub use collection::{Collection, DeleteCount, Update, UpdateOptions};
pub use cursor::Cursor;
pub use database::Database;
pub use query::{Query, SortSpec};
pub use record::{Document, Record};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flatdoc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
