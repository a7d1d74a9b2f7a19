//! Configuration for flatdoc
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a flatdoc database
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all collection files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── users.json       (one file per collection)
    ///     └── orders.json
    pub data_dir: PathBuf,

    /// Write collection files as indented JSON (2 spaces)
    pub pretty_print: bool,

    /// fsync the temp file before it replaces the collection file
    pub sync_writes: bool,

    /// What to do when a collection file cannot be parsed
    pub corruption_policy: CorruptionPolicy,
}

/// Recovery policy for collection files that fail to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// Log a warning and treat the collection as empty.
    ///
    /// The next successful write replaces the unreadable file, so its
    /// previous content is lost.
    TreatAsEmpty,

    /// Fail the operation and leave the file untouched
    Fail,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./flatdoc_data"),
            pretty_print: true,
            sync_writes: true,
            corruption_policy: CorruptionPolicy::TreatAsEmpty,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all collection files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Write indented JSON
    pub fn pretty_print(mut self, pretty: bool) -> Self {
        self.config.pretty_print = pretty;
        self
    }

    /// fsync every rewrite before the rename
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    /// Set the corruption recovery policy
    pub fn corruption_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.config.corruption_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
