//! Key-value store interface consumed by the ORM layer.
//!
//! Backends expose an ordered byte-key space with point reads, range
//! iteration and an atomic batch write. Every bucket, index and sequence is
//! built on nothing more than these operations.

use crate::error::NetabaseResult;

/// A raw `(key, value)` pair as returned by a range scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Iterator over a key range in ascending byte order.
///
/// The underlying scan is released when the iterator is dropped.
pub type StoreIter<'a> = Box<dyn Iterator<Item = NetabaseResult<KvPair>> + 'a>;

/// Read access to an ordered key-value store.
pub trait ReadOnlyKvStore {
    /// Get the value stored under `key`.
    fn get(&self, key: &[u8]) -> NetabaseResult<Option<Vec<u8>>>;

    /// Check whether `key` exists without reading the value.
    fn has(&self, key: &[u8]) -> NetabaseResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate over `[start, end)` in ascending byte order.
    ///
    /// `end = None` leaves the range open at the top.
    fn iterator(&self, start: &[u8], end: Option<&[u8]>) -> NetabaseResult<StoreIter<'_>>;
}

/// Write access to an ordered key-value store.
pub trait KvStore: ReadOnlyKvStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> NetabaseResult<()>;

    fn delete(&mut self, key: &[u8]) -> NetabaseResult<()>;

    /// Apply every operation of `batch` atomically, in order.
    ///
    /// Either all operations become visible or none do.
    fn write_batch(&mut self, batch: Batch) -> NetabaseResult<()>;
}

/// A single mutation inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Set(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// An ordered set of mutations applied as one unit by [`KvStore::write_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Set(key.into(), value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete(key.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (the prefix is empty or all `0xFF`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
