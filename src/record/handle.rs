//! Record handle
//!
//! A fetched document paired with the collection that can persist it.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::collection::{Collection, Update};
use crate::error::Result;

use super::{lifecycle, Document};

/// A document plus a `save()` capability
///
/// Derefs to the underlying [`Document`] for reading and editing fields.
/// Serializing a `Record` emits only the document; the collection
/// reference never leaves the process.
#[derive(Clone)]
pub struct Record {
    doc: Document,
    collection: Collection,
}

impl Record {
    pub(crate) fn new(doc: Document, collection: Collection) -> Self {
        Self { doc, collection }
    }

    /// Canonical identifier, if the record has one yet
    pub fn id(&self) -> Option<&Value> {
        lifecycle::id_of(&self.doc)
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.doc.insert(key.into(), value.into())
    }

    /// Borrow the document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Drop the handle and keep the document
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// The owning collection
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Persist the record's current field values
    ///
    /// - With an identifier: replaces the stored record (fields removed
    ///   locally are removed on disk). Returns `false` if the record no
    ///   longer exists.
    /// - Without one: creates it and takes on the assigned `_id` and
    ///   timestamps.
    ///
    /// On success the handle is refreshed from what was stored.
    pub fn save(&mut self) -> Result<bool> {
        let stored = match self.id().cloned() {
            Some(id) => self
                .collection
                .update_by_id(&id, Update::replace(self.doc.clone()))?,
            None => Some(self.collection.create(self.doc.clone())?),
        };

        match stored {
            Some(record) => {
                self.doc = record.doc;
                Ok(true)
            }
            None => {
                tracing::debug!(
                    collection = %self.collection.name(),
                    "save() found no stored record to replace"
                );
                Ok(false)
            }
        }
    }

    /// Re-read the stored version
    ///
    /// Returns `false` (leaving the handle untouched) if it was deleted.
    pub fn reload(&mut self) -> Result<bool> {
        let Some(id) = self.id().cloned() else {
            return Ok(false);
        };
        match self.collection.find_by_id(&id)? {
            Some(record) => {
                self.doc = record.doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Deref for Record {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.doc
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.doc.serialize(serializer)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.doc)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("collection", &self.collection.name())
            .field("doc", &self.doc)
            .finish()
    }
}
