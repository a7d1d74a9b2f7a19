//! Collection Store
//!
//! Loads and rewrites one collection file.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{Config, CorruptionPolicy};
use crate::error::{FlatDocError, Result};
use crate::record::{self, Document};

/// Storage for a single named collection
///
/// ## Concurrency:
/// - No internal locking; every call must come from the collection's lane
/// - `persist` never leaves a half-written file behind: the new content is
///   written to `{name}.json.tmp` and renamed over the old file
#[derive(Debug, Clone)]
pub struct CollectionStore {
    /// Collection name (file stem)
    name: String,

    /// Path of the collection file
    path: PathBuf,

    /// Indented output
    pretty_print: bool,

    /// fsync before rename
    sync_writes: bool,

    /// Behaviour on unparsable content
    corruption_policy: CorruptionPolicy,
}

impl CollectionStore {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const FILE_EXTENSION: &'static str = "json";
    const TEMP_EXTENSION: &'static str = "json.tmp";

    /// Open the store for `name` under the configured data directory
    ///
    /// Creates the directory and an empty collection file if needed.
    pub fn open(config: &Config, name: &str) -> Result<Self> {
        let store = Self {
            name: name.to_string(),
            path: Self::collection_path(&config.data_dir, name),
            pretty_print: config.pretty_print,
            sync_writes: config.sync_writes,
            corruption_policy: config.corruption_policy,
        };
        store.init()?;
        Ok(store)
    }

    /// Ensure the parent directory and the collection file exist
    pub fn init(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        if !self.path.exists() {
            tracing::debug!("Initializing empty collection file {}", self.path.display());
            self.persist(&[])?;
        }
        Ok(())
    }

    /// Load every record in file order
    ///
    /// Returns:
    /// - `Ok(records)`: parsed content (ids canonicalized)
    /// - `Ok(vec![])`: file missing (re-created), or corrupt under
    ///   `CorruptionPolicy::TreatAsEmpty`
    /// - `Err(Corruption)`: corrupt under `CorruptionPolicy::Fail`
    pub fn load_all(&self) -> Result<Vec<Document>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.init()?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        match Self::parse(&bytes) {
            Ok(records) => Ok(records),
            Err(reason) => match self.corruption_policy {
                CorruptionPolicy::TreatAsEmpty => {
                    tracing::warn!(
                        collection = %self.name,
                        "Unreadable collection file {} treated as empty ({}); \
                         its content will be lost on the next write",
                        self.path.display(),
                        reason
                    );
                    Ok(Vec::new())
                }
                CorruptionPolicy::Fail => Err(FlatDocError::Corruption {
                    collection: self.name.clone(),
                    reason,
                }),
            },
        }
    }

    /// Replace the collection file with `records`
    pub fn persist(&self, records: &[Document]) -> Result<()> {
        let bytes = if self.pretty_print {
            serde_json::to_vec_pretty(records)?
        } else {
            serde_json::to_vec(records)?
        };

        let tmp_path = self.path.with_extension(Self::TEMP_EXTENSION);
        if let Err(e) = self.write_and_swap(&tmp_path, &bytes) {
            tracing::error!(
                collection = %self.name,
                "Failed to write {}: {}",
                self.path.display(),
                e
            );
            // Best effort; the original file is still intact
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!(
            collection = %self.name,
            "Persisted {} ({} items)",
            self.path.display(),
            records.len()
        );
        Ok(())
    }

    /// Look up one record by identifier (string/number tolerant)
    pub fn get_by_id(&self, id: &Value) -> Result<Option<Document>> {
        let records = self.load_all()?;
        Ok(records
            .into_iter()
            .find(|doc| record::id_of(doc).map_or(false, |own| record::ids_equal(own, id))))
    }

    /// Delete the collection file
    ///
    /// Returns `false` if it did not exist.
    pub fn remove_file(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the collection file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the file backing collection `name` in `dir`
    pub fn collection_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, Self::FILE_EXTENSION))
    }

    /// Collection name for a data-directory entry
    /// "users.json" → Some("users")
    pub fn parse_collection_name(path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != Self::FILE_EXTENSION {
            return None;
        }
        Some(path.file_stem()?.to_str()?.to_string())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_and_swap(&self, tmp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        {
            let mut file = File::create(tmp_path)?;
            file.write_all(bytes)?;
            if self.sync_writes {
                file.sync_all()?;
            }
        }
        fs::rename(tmp_path, &self.path)
    }

    /// Parse file content into canonicalized documents
    fn parse(bytes: &[u8]) -> std::result::Result<Vec<Document>, String> {
        // A zero-length file is an interrupted initialization, not data
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let values: Vec<Value> = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Value::Object(mut doc) => {
                    record::normalize_id(&mut doc);
                    Ok(doc)
                }
                other => Err(format!("element {} is not an object: {}", i, other)),
            })
            .collect()
    }
}
