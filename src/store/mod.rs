//! Store Module
//!
//! Durable storage for one collection per file.
//!
//! ## Responsibilities
//! - Load the full record list of a collection into memory
//! - Replace the whole file in one rewrite (temp file + rename)
//! - Auto-initialize missing files, apply the corruption policy to bad ones
//!
//! ## File Format
//! ```text
//! {data_dir}/{collection}.json
//! [
//!   {
//!     "_id": "4f1c…",
//!     "title": "…",
//!     "createdAt": "2024-05-01T09:30:00.123Z",
//!     "updatedAt": "2024-05-01T09:30:00.123Z"
//!   },
//!   ...
//! ]
//! ```
//!
//! Array order is insertion order. A store holds no locks: it is only ever
//! driven from its collection's lane in the serial queue.

mod collection_store;

pub use collection_store::CollectionStore;
