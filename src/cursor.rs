//! Cursor Module
//!
//! Lazy, chainable result shaping for `Collection::find`.
//!
//! ```text
//! find(query) ─▶ [filter] ─▶ sort ─▶ skip ─▶ limit ─▶ project ─▶ resolve()
//!                  │            (stages run in the order attached)
//!                  └─ one lane job reads the collection at resolve time
//! ```
//!
//! Building a cursor never touches storage; every `resolve` takes a fresh
//! snapshot.

use crate::collection::Collection;
use crate::error::Result;
use crate::query::{Query, SortSpec};
use crate::queue::Pending;
use crate::record::{Document, Record};

/// A result-shaping step applied after filtering
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Sort(SortSpec),
    Skip(usize),
    Limit(usize),
    /// Field selection; accepted and carried but does not alter results
    Project(Vec<String>),
}

impl Stage {
    fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        match self {
            Stage::Sort(spec) => {
                spec.sort(&mut docs);
                docs
            }
            Stage::Skip(n) => {
                let n = (*n).min(docs.len());
                docs.split_off(n)
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
            Stage::Project(_) => docs,
        }
    }
}

/// A deferred query over one collection
#[derive(Debug, Clone)]
pub struct Cursor {
    collection: Collection,
    filter: Query,
    stages: Vec<Stage>,
}

impl Cursor {
    pub(crate) fn new(collection: Collection, filter: Query) -> Self {
        Self {
            collection,
            filter,
            stages: Vec::new(),
        }
    }

    /// Append a sort stage
    pub fn sort(self, spec: SortSpec) -> Self {
        self.with_stage(Stage::Sort(spec))
    }

    /// Append a skip stage
    pub fn skip(self, n: usize) -> Self {
        self.with_stage(Stage::Skip(n))
    }

    /// Append a limit stage (`limit(0)` yields nothing)
    pub fn limit(self, n: usize) -> Self {
        self.with_stage(Stage::Limit(n))
    }

    /// Append a projection stage
    pub fn project(self, fields: &[&str]) -> Self {
        self.with_stage(Stage::Project(
            fields.iter().map(|f| f.to_string()).collect(),
        ))
    }

    /// Get the initiating filter
    pub fn filter(&self) -> &Query {
        &self.filter
    }

    /// Get the stages in attach order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the pipeline and return plain documents
    pub fn resolve(&self) -> Result<Vec<Document>> {
        let docs = self.submit()?.wait()?;
        Ok(self.shape(docs))
    }

    /// Run the pipeline and return record handles
    pub fn records(&self) -> Result<Vec<Record>> {
        Ok(self.collection.wrap_all(self.resolve()?))
    }

    /// Run the pipeline and return the first result
    pub fn first(&self) -> Result<Option<Record>> {
        Ok(self.records()?.into_iter().next())
    }

    /// Run the pipeline and count the results
    pub fn count(&self) -> Result<usize> {
        Ok(self.resolve()?.len())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Admit the snapshot-and-filter job to the collection lane
    fn submit(&self) -> Result<Pending<Vec<Document>>> {
        let filter = self.filter.clone();
        self.collection.enqueue(move |store| {
            let records = store.load_all()?;
            if filter.is_empty() {
                return Ok(records);
            }
            Ok(records.into_iter().filter(|doc| filter.matches(doc)).collect())
        })
    }

    fn shape(&self, docs: Vec<Document>) -> Vec<Document> {
        self.stages.iter().fold(docs, |docs, stage| stage.apply(docs))
    }
}
