//! Persistent monotonic counters.
//!
//! A sequence lives under `_s.<bucket>:<name>` and stores the last value it
//! handed out as 8 big-endian bytes. Values start at 1 and are never reused,
//! even when the write that consumed one later fails.

use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::store::{KvStore, ReadOnlyKvStore};

const SEQUENCE_PREFIX: &str = "_s.";

/// A named counter scoped to a bucket.
///
/// # Example
///
/// ```
/// use netabase_orm::databases::MemoryStore;
/// use netabase_orm::orm::Sequence;
///
/// let mut store = MemoryStore::new();
/// let seq = Sequence::new("cnt", "id");
/// assert_eq!(seq.next_val(&mut store).unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
/// assert_eq!(seq.next_int(&mut store).unwrap(), 2);
/// assert_eq!(seq.curr_val(&store).unwrap(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    id: Vec<u8>,
}

impl Sequence {
    pub fn new(bucket: &str, name: &str) -> Self {
        Self {
            id: format!("{SEQUENCE_PREFIX}{bucket}:{name}").into_bytes(),
        }
    }

    /// Storage key of the counter.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Last value handed out, `0` if none yet.
    pub fn curr_val<S: ReadOnlyKvStore + ?Sized>(&self, db: &S) -> NetabaseResult<u64> {
        match db.get(&self.id)? {
            None => Ok(0),
            Some(raw) => decode_u64(&raw),
        }
    }

    /// Increment the counter and return the new value.
    pub fn next_int<S: KvStore + ?Sized>(&self, db: &mut S) -> NetabaseResult<u64> {
        let next = self
            .curr_val(&*db)?
            .checked_add(1)
            .ok_or_else(|| NetabaseError::Other("sequence overflow".into()))?;
        db.set(&self.id, &encode_u64(next))?;
        Ok(next)
    }

    /// Increment the counter and return the new value as an 8-byte key.
    ///
    /// Big-endian encoding keeps generated keys in insertion order.
    pub fn next_val<S: KvStore + ?Sized>(&self, db: &mut S) -> NetabaseResult<Vec<u8>> {
        Ok(encode_u64(self.next_int(db)?).to_vec())
    }
}

/// Big-endian key for a sequence value.
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Inverse of [`encode_u64`].
pub fn decode_u64(raw: &[u8]) -> NetabaseResult<u64> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| {
        NetabaseError::Other(format!("sequence value must be 8 bytes, got {}", raw.len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}
