//! Collection Module
//!
//! The public CRUD surface over one collection.
//!
//! ## Responsibilities
//! - Route every operation through the collection's lane in the serial queue
//! - Compute the complete new state in memory before anything is persisted
//! - Hand results back as `Record` handles (or plain documents for deletes)
//!
//! ## Operation lifecycle
//! ```text
//! admitted → loaded → computed → persisted → completed
//!                         └────────────────→ failed   (nothing written)
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::cursor::Cursor;
use crate::error::{FlatDocError, Result};
use crate::query::Query;
use crate::queue::{Pending, SerialQueue};
use crate::record::{self, Document, Record, ALT_ID_FIELD, ID_FIELD};
use crate::store::CollectionStore;

/// Boxed whole-document transform
pub type TransformFn = Box<dyn FnOnce(Document) -> Document + Send + 'static>;

/// How an existing record is changed
pub enum Update {
    /// Shallow merge of top-level fields (identifier fields are ignored)
    Merge(Document),

    /// Replace the record with the function's output
    ///
    /// The function receives the entire current record and runs while the
    /// collection's lane is held, so no other operation on the collection
    /// can interleave between its read and the write.
    Transform(TransformFn),
}

impl Update {
    /// Merge the given fields
    pub fn merge(fields: Document) -> Self {
        Update::Merge(fields)
    }

    /// Merge fields from a JSON object; a top-level `$set` wrapper is unwrapped
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(Update::Merge(merge_fields(value)?))
    }

    /// Apply a transform atomically
    pub fn transform<F>(f: F) -> Self
    where
        F: FnOnce(Document) -> Document + Send + 'static,
    {
        Update::Transform(Box::new(f))
    }

    /// Replace the whole record with `doc` (identifier is kept)
    pub fn replace(doc: Document) -> Self {
        Update::transform(move |_| doc)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Merge(fields) => f.debug_tuple("Merge").field(fields).finish(),
            Update::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// Options for [`Collection::update_one`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Create a record from the query and the update when nothing matches
    pub upsert: bool,
}

impl UpdateOptions {
    /// Options with upsert enabled
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Outcome of [`Collection::delete_many`]
///
/// An empty query clears the collection and reports `All`, which keeps
/// "cleared" distinct from "matched zero records".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCount {
    /// The collection was cleared
    All,

    /// This many matching records were removed
    Removed(usize),
}

impl DeleteCount {
    /// The numeric count, if one was reported
    pub fn removed(&self) -> Option<usize> {
        match self {
            DeleteCount::All => None,
            DeleteCount::Removed(n) => Some(*n),
        }
    }
}

impl Serialize for DeleteCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DeleteCount::All => serializer.serialize_str("all"),
            DeleteCount::Removed(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

/// Handle to one named collection
///
/// Cheap to clone; clones share the same store and lane.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    /// Collection name (also the lane id)
    name: String,

    /// Backing file, only touched from inside lane jobs
    store: Arc<CollectionStore>,

    /// Shared with every collection of the database
    queue: Arc<SerialQueue>,
}

impl Collection {
    pub(crate) fn new(store: CollectionStore, queue: Arc<SerialQueue>) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                name: store.name().to_string(),
                store: Arc::new(store),
                queue,
            }),
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Insert one record
    ///
    /// Assigns `_id` when absent, stamps `createdAt`/`updatedAt` and appends
    /// to the end of the collection. A supplied `_id` that already exists
    /// is rejected.
    pub fn create(&self, doc: Document) -> Result<Record> {
        let stored = self.run(move |store| {
            let mut records = store.load_all()?;
            let doc = prepare_new(doc, &records)?;
            records.push(doc.clone());
            store.persist(&records)?;
            Ok(doc)
        })?;
        Ok(Record::new(stored, self.clone()))
    }

    /// Insert several records in order with a single rewrite
    pub fn create_many(&self, docs: Vec<Document>) -> Result<Vec<Record>> {
        let stored = self.run(move |store| {
            let mut records = store.load_all()?;
            let first_new = records.len();
            for doc in docs {
                let doc = prepare_new(doc, &records)?;
                records.push(doc);
            }
            store.persist(&records)?;
            Ok(records.split_off(first_new))
        })?;
        Ok(self.wrap_all(stored))
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Lazily query the collection (an empty query matches everything)
    pub fn find(&self, query: Query) -> Cursor {
        Cursor::new(self.clone(), query)
    }

    /// First match in collection order
    pub fn find_one(&self, query: Query) -> Result<Option<Record>> {
        let found = self.run(move |store| {
            Ok(store.load_all()?.into_iter().find(|doc| query.matches(doc)))
        })?;
        Ok(found.map(|doc| Record::new(doc, self.clone())))
    }

    /// Direct identifier lookup
    ///
    /// An id with no comparable form (`null`, arrays, objects) returns `None`
    /// without touching storage.
    pub fn find_by_id(&self, id: &Value) -> Result<Option<Record>> {
        if record::id_key(id).is_none() {
            return Ok(None);
        }
        let id = id.clone();
        let found = self.run(move |store| store.get_by_id(&id))?;
        Ok(found.map(|doc| Record::new(doc, self.clone())))
    }

    /// Number of matching records
    pub fn count(&self, query: Query) -> Result<usize> {
        self.run(move |store| {
            Ok(store.load_all()?.iter().filter(|doc| query.matches(doc)).count())
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Update the record with identifier `id`
    ///
    /// Returns the stored result, or `None` if no record has that id.
    pub fn update_by_id(&self, id: &Value, update: Update) -> Result<Option<Record>> {
        if record::id_key(id).is_none() {
            return Ok(None);
        }
        let id = id.clone();
        let updated = self.run(move |store| {
            let mut records = store.load_all()?;
            let index = records.iter().position(|doc| has_id(doc, &id));
            apply_at(store, &mut records, index, update)
        })?;
        Ok(updated.map(|doc| Record::new(doc, self.clone())))
    }

    /// Update the first record matching `query`
    ///
    /// Lookup and write happen in one lane job. With `upsert`, a miss
    /// creates a record from the query's literal fields plus the update.
    pub fn update_one(
        &self,
        query: Query,
        update: Update,
        options: UpdateOptions,
    ) -> Result<Option<Record>> {
        let updated = self.run(move |store| {
            let mut records = store.load_all()?;
            let index = records.iter().position(|doc| query.matches(doc));

            if index.is_none() && options.upsert {
                let seed = query.seed_document();
                let doc = match update {
                    Update::Merge(fields) => {
                        let mut doc = seed;
                        doc.extend(fields);
                        doc
                    }
                    Update::Transform(f) => f(seed),
                };
                let doc = prepare_new(doc, &records)?;
                records.push(doc.clone());
                store.persist(&records)?;
                tracing::debug!(collection = %store.name(), "Upsert created a new record");
                return Ok(Some(doc));
            }

            apply_at(store, &mut records, index, update)
        })?;
        Ok(updated.map(|doc| Record::new(doc, self.clone())))
    }

    /// Merge `fields` into every matching record
    ///
    /// Accepts either plain fields or a `{"$set": {...}}` wrapper. Returns
    /// the number of records modified.
    pub fn update_many(&self, query: Query, fields: Document) -> Result<usize> {
        let fields = merge_fields(Value::Object(fields))?;
        self.run(move |store| {
            let mut records = store.load_all()?;
            let mut modified = 0;

            for doc in records.iter_mut().filter(|doc| query.matches(doc)) {
                merge_into(doc, &fields);
                record::stamp_updated(doc);
                modified += 1;
            }

            if modified > 0 {
                store.persist(&records)?;
            }
            Ok(modified)
        })
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Remove the record with identifier `id` and return it
    pub fn delete_by_id(&self, id: &Value) -> Result<Option<Document>> {
        if record::id_key(id).is_none() {
            return Ok(None);
        }
        let id = id.clone();
        self.run(move |store| {
            let mut records = store.load_all()?;
            let index = records.iter().position(|doc| has_id(doc, &id));
            remove_at(store, &mut records, index)
        })
    }

    /// Remove the first record matching `query` and return it
    pub fn delete_one(&self, query: Query) -> Result<Option<Document>> {
        self.run(move |store| {
            let mut records = store.load_all()?;
            let index = records.iter().position(|doc| query.matches(doc));
            remove_at(store, &mut records, index)
        })
    }

    /// Remove every record matching `query`
    ///
    /// An empty query clears the collection and returns `DeleteCount::All`.
    pub fn delete_many(&self, query: Query) -> Result<DeleteCount> {
        self.run(move |store| {
            if query.is_empty() {
                // Loading first lets CorruptionPolicy::Fail refuse the rewrite
                store.load_all()?;
                store.persist(&[])?;
                return Ok(DeleteCount::All);
            }

            let mut records = store.load_all()?;
            let before = records.len();
            records.retain(|doc| !query.matches(doc));
            let removed = before - records.len();

            if removed > 0 {
                store.persist(&records)?;
            }
            Ok(DeleteCount::Removed(removed))
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the collection name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the path of the backing file
    pub fn path(&self) -> &Path {
        self.inner.store.path()
    }

    // =========================================================================
    // Lane plumbing
    // =========================================================================

    /// Run `operation` on this collection's lane and wait for it
    pub(crate) fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CollectionStore) -> Result<T> + Send + 'static,
    {
        self.enqueue(operation)?.wait()
    }

    /// Admit `operation` to this collection's lane without waiting
    pub(crate) fn enqueue<T, F>(&self, operation: F) -> Result<Pending<T>>
    where
        T: Send + 'static,
        F: FnOnce(&CollectionStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner.store);
        self.inner.queue.enqueue(&self.inner.name, move || operation(&store))
    }

    pub(crate) fn wrap_all(&self, docs: Vec<Document>) -> Vec<Record> {
        docs.into_iter()
            .map(|doc| Record::new(doc, self.clone()))
            .collect()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("path", &self.inner.store.path())
            .finish()
    }
}

// =============================================================================
// Helpers (run inside lane jobs)
// =============================================================================

/// Stamp a new record and check its identifier is free
fn prepare_new(mut doc: Document, existing: &[Document]) -> Result<Document> {
    record::stamp_created(&mut doc);
    if let Some(id) = record::id_of(&doc) {
        if existing.iter().any(|other| has_id(other, id)) {
            return Err(FlatDocError::InvalidDocument(format!(
                "duplicate {} {}",
                ID_FIELD, id
            )));
        }
    }
    Ok(doc)
}

fn has_id(doc: &Document, id: &Value) -> bool {
    record::id_of(doc).map_or(false, |own| record::ids_equal(own, id))
}

/// Apply `update` to `records[index]` and persist, or report a miss
fn apply_at(
    store: &CollectionStore,
    records: &mut [Document],
    index: Option<usize>,
    update: Update,
) -> Result<Option<Document>> {
    let Some(index) = index else {
        return Ok(None);
    };

    let current = std::mem::take(&mut records[index]);
    let id = current.get(ID_FIELD).cloned();

    let mut next = match update {
        Update::Merge(fields) => {
            let mut merged = current;
            merge_into(&mut merged, &fields);
            merged
        }
        Update::Transform(f) => f(current),
    };

    if let Some(id) = id {
        pin_id(&mut next, id);
    }
    record::stamp_updated(&mut next);

    records[index] = next;
    store.persist(records)?;
    Ok(Some(records[index].clone()))
}

fn remove_at(
    store: &CollectionStore,
    records: &mut Vec<Document>,
    index: Option<usize>,
) -> Result<Option<Document>> {
    let Some(index) = index else {
        return Ok(None);
    };
    let removed = records.remove(index);
    store.persist(records)?;
    Ok(Some(removed))
}

/// Shallow merge; identifier fields are immutable and skipped
fn merge_into(doc: &mut Document, fields: &Document) {
    for (key, value) in fields {
        if key == ID_FIELD || key == ALT_ID_FIELD {
            continue;
        }
        doc.insert(key.clone(), value.clone());
    }
}

/// Restore the original identifier at the front of the record
fn pin_id(doc: &mut Document, id: Value) {
    if doc.contains_key(ID_FIELD) {
        doc.insert(ID_FIELD.to_string(), id);
        return;
    }
    let rest = std::mem::take(doc);
    doc.insert(ID_FIELD.to_string(), id);
    doc.extend(rest);
}

/// Unwrap `{"$set": {...}}` and require an object
fn merge_fields(value: Value) -> Result<Document> {
    let Value::Object(mut map) = value else {
        return Err(FlatDocError::InvalidDocument(
            "update must be a JSON object".to_string(),
        ));
    };

    match map.remove("$set") {
        Some(Value::Object(set)) if map.is_empty() => Ok(set),
        Some(_) => Err(FlatDocError::InvalidDocument(
            "'$set' must be the only key and hold an object".to_string(),
        )),
        None => Ok(map),
    }
}
