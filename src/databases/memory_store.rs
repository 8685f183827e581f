//! In-memory ordered key-value store.
//!
//! All data lives in a `BTreeMap`; nothing touches disk. Used by tests and by
//! callers that stage a block's mutations before handing them to a durable
//! backend.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::config::MemoryConfig;
use crate::error::NetabaseResult;
use crate::traits::store::{Batch, BatchOp, KvStore, ReadOnlyKvStore, StoreIter};

/// In-memory storage backend.
///
/// # Example
///
/// ```
/// use netabase_orm::databases::MemoryStore;
/// use netabase_orm::traits::store::{KvStore, ReadOnlyKvStore};
///
/// let mut store = MemoryStore::new();
/// store.set(b"cnt:\x01", b"one").unwrap();
/// assert_eq!(store.get(b"cnt:\x01").unwrap(), Some(b"one".to_vec()));
/// assert!(!store.has(b"cnt:\x02").unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with the configured entries.
    pub fn from_config(config: MemoryConfig) -> Self {
        Self {
            data: config.initial.into_iter().collect(),
        }
    }

    /// Number of entries across all namespaces.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.data.keys().map(Vec::as_slice)
    }
}

impl ReadOnlyKvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> NetabaseResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> NetabaseResult<bool> {
        Ok(self.data.contains_key(key))
    }

    fn iterator(&self, start: &[u8], end: Option<&[u8]>) -> NetabaseResult<StoreIter<'_>> {
        if end.is_some_and(|end| end <= start) {
            return Ok(Box::new(std::iter::empty()));
        }
        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        let range = self
            .data
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(k, v)| Ok((k.clone(), v.clone())));
        Ok(Box::new(range))
    }
}

impl KvStore for MemoryStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> NetabaseResult<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> NetabaseResult<()> {
        self.data.remove(key);
        Ok(())
    }

    fn write_batch(&mut self, batch: Batch) -> NetabaseResult<()> {
        for op in batch.into_ops() {
            match op {
                BatchOp::Set(key, value) => {
                    self.data.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
