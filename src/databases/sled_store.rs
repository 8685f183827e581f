//! Sled database backend.
//!
//! Wraps a single sled tree as an ordered key-value store. Batches are applied
//! with `apply_batch`, so a bucket save (primary entry plus every index
//! mutation) is atomic on disk.
//!
//! ```
//! use netabase_orm::config::StoreConfig;
//! use netabase_orm::databases::SledStore;
//! use netabase_orm::traits::store::{KvStore, ReadOnlyKvStore};
//!
//! let config = StoreConfig::builder().temporary(true).build();
//! let mut store = SledStore::open(&config).unwrap();
//! store.set(b"cnt:\x01", b"one").unwrap();
//! assert!(store.has(b"cnt:\x01").unwrap());
//! ```

use std::path::Path;
use std::time::Instant;

use log::debug;

use crate::config::StoreConfig;
use crate::error::NetabaseResult;
use crate::traits::store::{Batch, BatchOp, KvStore, ReadOnlyKvStore, StoreIter};

/// Sled-based store.
///
/// Sled's `Db` uses `Arc` internally, so cloning is cheap and every clone
/// sees the same data.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Create or open a sled store at the given path with default settings.
    pub fn new<P: AsRef<Path>>(path: P) -> NetabaseResult<Self> {
        Self::open(&StoreConfig::new(path.as_ref()))
    }

    /// Create a temporary store that is removed when dropped.
    pub fn temporary() -> NetabaseResult<Self> {
        Self::open(&StoreConfig::builder().temporary(true).build())
    }

    pub fn open(config: &StoreConfig) -> NetabaseResult<Self> {
        let start = Instant::now();
        debug!("SledStore: Opening database at {}", config.path.display());

        let mut sled_config = sled::Config::new()
            .cache_capacity(config.cache_capacity_bytes)
            .flush_every_ms(config.flush_every_ms);
        if config.temporary {
            sled_config = sled_config.temporary(true);
        } else {
            sled_config = sled_config.path(&config.path);
        }
        let db = sled_config.open()?;

        debug!("SledStore: Opened in {:?}", start.elapsed());
        Ok(SledStore { db })
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> NetabaseResult<usize> {
        Ok(self.db.flush()?)
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl ReadOnlyKvStore for SledStore {
    fn get(&self, key: &[u8]) -> NetabaseResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn has(&self, key: &[u8]) -> NetabaseResult<bool> {
        Ok(self.db.contains_key(key)?)
    }

    fn iterator(&self, start: &[u8], end: Option<&[u8]>) -> NetabaseResult<StoreIter<'_>> {
        let iter = match end {
            Some(end) if end <= start => return Ok(Box::new(std::iter::empty())),
            Some(end) => self.db.range(start..end),
            None => self.db.range(start..),
        };
        Ok(Box::new(iter.map(|item| {
            let (k, v) = item?;
            Ok((k.to_vec(), v.to_vec()))
        })))
    }
}

impl KvStore for SledStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> NetabaseResult<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> NetabaseResult<()> {
        self.db.remove(key)?;
        Ok(())
    }

    fn write_batch(&mut self, batch: Batch) -> NetabaseResult<()> {
        let mut sled_batch = sled::Batch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set(key, value) => sled_batch.insert(key, value),
                BatchOp::Delete(key) => sled_batch.remove(key),
            }
        }
        self.db.apply_batch(sled_batch)?;
        Ok(())
    }
}
