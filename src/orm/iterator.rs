//! Resumable full-bucket iteration.
//!
//! A [`ModelBucketIterator`] keeps only a cursor between calls: each call to
//! [`next`](ModelBucketIterator::next) opens a fresh scan from the cursor,
//! reads a single entry and releases the scan. Writes made between calls
//! are therefore observed by later calls.

use log::trace;

use super::bucket::{KEY_UPPER_BOUND, bucket_prefix};
use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::model::Model;
use crate::traits::store::ReadOnlyKvStore;

/// Iterate over every entry of the bucket called `bucket_name`.
///
/// The name is not checked against a registered bucket. Schema versions are
/// not checked either.
///
/// # Example
///
/// ```
/// use netabase_orm::databases::MemoryStore;
/// use netabase_orm::orm::iter_all;
/// use netabase_orm::traits::store::KvStore;
///
/// # use netabase_orm::error::NetabaseResult;
/// # use netabase_orm::traits::model::Model;
/// # #[derive(Debug, Default)]
/// # struct Raw(Vec<u8>);
/// # impl Model for Raw {
/// #     fn marshal(&self) -> NetabaseResult<Vec<u8>> { Ok(self.0.clone()) }
/// #     fn unmarshal(&mut self, b: &[u8]) -> NetabaseResult<()> { self.0 = b.to_vec(); Ok(()) }
/// #     fn validate(&self) -> NetabaseResult<()> { Ok(()) }
/// # }
/// let mut db = MemoryStore::new();
/// db.set(b"cnt:\x01", b"one").unwrap();
///
/// let mut it = iter_all("cnt");
/// let mut raw = Raw::default();
/// assert_eq!(it.next(&db, &mut raw).unwrap(), b"\x01".to_vec());
/// assert_eq!(raw.0, b"one".to_vec());
/// assert!(it.next(&db, &mut raw).unwrap_err().is_iterator_exhausted());
/// ```
pub fn iter_all(bucket_name: &str) -> ModelBucketIterator {
    ModelBucketIterator::new(bucket_prefix(bucket_name))
}

/// Cursor over a bucket namespace `[prefix, prefix || 0xFF×7)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBucketIterator {
    prefix_len: usize,
    cursor: Vec<u8>,
    end: Vec<u8>,
}

impl ModelBucketIterator {
    pub fn new(prefix: Vec<u8>) -> Self {
        let mut end = prefix.clone();
        end.extend_from_slice(&KEY_UPPER_BOUND);
        Self {
            prefix_len: prefix.len(),
            cursor: prefix,
            end,
        }
    }

    /// Decode the next entry into `dest` and return its key without the
    /// bucket prefix.
    ///
    /// Fails with [`NetabaseError::IteratorExhausted`] once no entry is left
    /// in the range.
    pub fn next<S, M>(&mut self, db: &S, dest: &mut M) -> NetabaseResult<Vec<u8>>
    where
        S: ReadOnlyKvStore + ?Sized,
        M: Model + ?Sized,
    {
        let (key, value) = {
            let mut scan = db.iterator(&self.cursor, Some(&self.end))?;
            match scan.next() {
                Some(entry) => entry?,
                None => return Err(NetabaseError::IteratorExhausted),
            }
        };

        dest.unmarshal(&value)?;
        trace!("iter_all: read {:?}", key);

        let raw = key[self.prefix_len..].to_vec();
        self.cursor = key;
        self.cursor.push(0);
        Ok(raw)
    }

    /// Key the next scan starts from.
    pub fn cursor(&self) -> &[u8] {
        &self.cursor
    }
}
