//! Database Module
//!
//! Entry point that owns the data directory and hands out collections.
//!
//! ## Responsibilities
//! - Create the data directory on open
//! - Share one serial queue across all collections
//! - Cache one `Collection` handle per name

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collection::Collection;
use crate::config::Config;
use crate::error::{FlatDocError, Result};
use crate::queue::SerialQueue;
use crate::store::CollectionStore;

/// An open flatdoc data directory
///
/// ## Concurrency Model: one lane per collection
///
/// - Operations on the same collection run one at a time, in submission order
/// - Operations on different collections proceed independently
/// - Nothing coordinates across collections; keeping two collections
///   consistent with each other is up to the caller
pub struct Database {
    /// Database configuration
    config: Config,

    /// Lanes for every collection
    queue: Arc<SerialQueue>,

    /// Collections opened so far
    collections: Mutex<HashMap<String, Collection>>,
}

impl Database {
    /// Longest accepted collection name
    const MAX_NAME_LEN: usize = 128;

    /// Open or create a database with the given config
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        tracing::info!(
            "Opened flatdoc database at {} (corruption policy: {:?})",
            config.data_dir.display(),
            config.corruption_policy
        );

        Ok(Self {
            config,
            queue: Arc::new(SerialQueue::new()),
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get (or create) the collection `name`
    ///
    /// Names may contain ASCII letters, digits, `_` and `-`.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        Self::validate_name(name)?;

        let mut collections = self.collections.lock();
        if let Some(collection) = collections.get(name) {
            return Ok(collection.clone());
        }

        let store = CollectionStore::open(&self.config, name)?;
        let collection = Collection::new(store, Arc::clone(&self.queue));
        collections.insert(name.to_string(), collection.clone());

        tracing::debug!(collection = %name, "Collection opened");
        Ok(collection)
    }

    /// Names of every collection file in the data directory, sorted
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.data_dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(name) = CollectionStore::parse_collection_name(&path) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a collection's file
    ///
    /// Runs on the collection's lane, after anything already queued.
    /// Returns `false` if there was no file. Handles obtained earlier stay
    /// usable and start from an empty collection.
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        let collection = self.collection(name)?;
        let removed = collection.run(|store| store.remove_file())?;
        self.collections.lock().remove(name);

        tracing::info!(collection = %name, removed, "Collection dropped");
        Ok(removed)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of collection lanes started
    pub fn lane_count(&self) -> usize {
        self.queue.lane_count()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn validate_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name.len() <= Self::MAX_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if valid {
            Ok(())
        } else {
            Err(FlatDocError::InvalidCollectionName(name.to_string()))
        }
    }
}
