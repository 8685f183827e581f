//! Backend configuration.
//!
//! Configuration structs use the builder pattern via `typed-builder`. Loading
//! them from files or flags is left to the embedding application; the structs
//! derive serde so any format can be used.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Configuration for the file-based sled backend.
///
/// # Examples
///
/// ```
/// use netabase_orm::config::StoreConfig;
///
/// // Create with defaults
/// let config = StoreConfig::builder()
///     .path("my_database")
///     .build();
/// assert!(!config.temporary);
///
/// // Customize options
/// let config = StoreConfig::builder()
///     .path("/data/state")
///     .cache_capacity_bytes(512 * 1024 * 1024)
///     .flush_every_ms(None)
///     .build();
/// assert_eq!(config.flush_every_ms, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct StoreConfig {
    /// Directory holding the database files. Ignored for temporary stores.
    #[builder(default, setter(into))]
    pub path: PathBuf,

    /// Page cache size in bytes
    #[builder(default = 256 * 1024 * 1024)]
    pub cache_capacity_bytes: u64,

    /// Remove the database when the store is dropped
    #[builder(default = false)]
    pub temporary: bool,

    /// Background flush interval; `None` flushes only on explicit request
    #[builder(default = Some(500))]
    pub flush_every_ms: Option<u64>,
}

impl StoreConfig {
    /// Create a basic configuration with just a path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::builder().path(path.as_ref()).build()
    }
}

/// Configuration for the in-memory backend.
///
/// ```
/// use netabase_orm::config::MemoryConfig;
///
/// let config = MemoryConfig::builder()
///     .initial(vec![(b"cnt:\x01".to_vec(), b"one".to_vec())])
///     .build();
/// assert_eq!(config.initial.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct MemoryConfig {
    /// Entries the store starts with
    #[builder(default)]
    pub initial: Vec<(Vec<u8>, Vec<u8>)>,
}
