//! Secondary indexes.
//!
//! An index maps keys derived from a model's content to the primary keys of
//! the models that produced them. Two storage layouts exist:
//!
//! * **Compact**: one entry per derived key, `_i.<bucket>.<index>:<derived>`,
//!   whose value is a protobuf [`MultiRef`] listing the primary keys in
//!   ascending byte order. Compact indexes may be unique.
//! * **Native**: one entry per (derived key, primary key) pair. The entry key
//!   is the index prefix, the derived key length as a big-endian `u16`, the
//!   derived key and the primary key. Lookups are prefix scans and results
//!   come back in primary key order without materialising a list.
//!
//! Index maintenance never writes directly: [`Index::plan_update`] only reads
//! the store and appends to a [`Batch`], so a unique violation is reported
//! before anything is mutated.

use std::collections::BTreeSet;
use std::sync::Arc;

use prost::Message;
use strum::{AsRefStr, Display};

use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::model::Model;
use crate::traits::store::{Batch, ReadOnlyKvStore, prefix_end};

const INDEX_PREFIX: &str = "_i.";

/// Derives at most one index key from a model.
pub type SingleKeyFn = Arc<dyn Fn(&dyn Model) -> NetabaseResult<Option<Vec<u8>>> + Send + Sync>;

/// Derives any number of index keys from a model.
pub type MultiKeyFn = Arc<dyn Fn(&dyn Model) -> NetabaseResult<Vec<Vec<u8>>> + Send + Sync>;

/// Primary keys matched by an index lookup.
pub type IndexKeys<'a> = Box<dyn Iterator<Item = NetabaseResult<Vec<u8>>> + 'a>;

/// Key derivation for an index.
///
/// Both variants are normalised to the multi-key form when the index is
/// built. Empty derived keys are ignored: a model that yields nothing is
/// simply not indexed.
#[derive(Clone)]
pub enum Indexer {
    Single(SingleKeyFn),
    Multi(MultiKeyFn),
}

impl Indexer {
    /// Index by a single key computed from `M`.
    ///
    /// Called with any other model type, the indexer fails with
    /// [`NetabaseError::TypeMismatch`].
    pub fn single<M, F>(derive: F) -> Self
    where
        M: Model,
        F: Fn(&M) -> NetabaseResult<Option<Vec<u8>>> + Send + Sync + 'static,
    {
        Indexer::Single(Arc::new(
            move |model: &dyn Model| -> NetabaseResult<Option<Vec<u8>>> {
                derive(downcast::<M>(model)?)
            },
        ))
    }

    /// Index by every key computed from `M`.
    pub fn multi<M, F>(derive: F) -> Self
    where
        M: Model,
        F: Fn(&M) -> NetabaseResult<Vec<Vec<u8>>> + Send + Sync + 'static,
    {
        Indexer::Multi(Arc::new(
            move |model: &dyn Model| -> NetabaseResult<Vec<Vec<u8>>> {
                derive(downcast::<M>(model)?)
            },
        ))
    }

    pub fn into_multi(self) -> MultiKeyFn {
        match self {
            Indexer::Multi(f) => f,
            Indexer::Single(f) => Arc::new(
                move |model: &dyn Model| -> NetabaseResult<Vec<Vec<u8>>> {
                    Ok(f(model)?.into_iter().collect())
                },
            ),
        }
    }
}

fn downcast<M: Model>(model: &dyn Model) -> NetabaseResult<&M> {
    model.as_any().downcast_ref::<M>().ok_or_else(|| {
        NetabaseError::TypeMismatch(format!(
            "indexer expects {}, got {}",
            std::any::type_name::<M>(),
            model.type_name()
        ))
    })
}

/// Storage layout of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum IndexKind {
    Compact,
    Native,
}

/// Value of a compact index entry.
#[derive(Clone, PartialEq, Message)]
pub struct MultiRef {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub refs: Vec<Vec<u8>>,
}

impl MultiRef {
    fn decode_refs(raw: Option<Vec<u8>>) -> NetabaseResult<Vec<Vec<u8>>> {
        match raw {
            None => Ok(Vec::new()),
            Some(raw) => Ok(MultiRef::decode(raw.as_slice())?.refs),
        }
    }

    /// Insert `key` keeping the list sorted. Returns false if already present.
    fn insert(refs: &mut Vec<Vec<u8>>, key: &[u8]) -> bool {
        match refs.binary_search_by(|r| r.as_slice().cmp(key)) {
            Ok(_) => false,
            Err(pos) => {
                refs.insert(pos, key.to_vec());
                true
            }
        }
    }

    fn remove(refs: &mut Vec<Vec<u8>>, key: &[u8]) -> bool {
        match refs.binary_search_by(|r| r.as_slice().cmp(key)) {
            Ok(pos) => {
                refs.remove(pos);
                true
            }
            Err(_) => false,
        }
    }
}

/// A secondary index over one bucket.
#[derive(Clone)]
pub struct Index {
    name: String,
    bucket: String,
    prefix: Vec<u8>,
    unique: bool,
    kind: IndexKind,
    indexer: MultiKeyFn,
}

impl Index {
    pub(crate) fn compact(bucket: &str, name: &str, indexer: Indexer, unique: bool) -> Self {
        Self::with_kind(bucket, name, indexer, unique, IndexKind::Compact)
    }

    pub(crate) fn native(bucket: &str, name: &str, indexer: Indexer) -> Self {
        Self::with_kind(bucket, name, indexer, false, IndexKind::Native)
    }

    fn with_kind(bucket: &str, name: &str, indexer: Indexer, unique: bool, kind: IndexKind) -> Self {
        Self {
            name: name.to_string(),
            bucket: bucket.to_string(),
            prefix: format!("{INDEX_PREFIX}{bucket}.{name}:").into_bytes(),
            unique,
            kind,
            indexer: indexer.into_multi(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Namespace prefix of every entry of this index.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Distinct, non-empty keys `model` is indexed under.
    pub fn derived_keys(&self, model: &dyn Model) -> NetabaseResult<BTreeSet<Vec<u8>>> {
        let keys = (self.indexer)(model)?;
        Ok(keys.into_iter().filter(|k| !k.is_empty()).collect())
    }

    /// Storage key of a compact entry, or the scan prefix of a native one.
    fn entry_prefix(&self, derived: &[u8]) -> NetabaseResult<Vec<u8>> {
        let mut key = self.prefix.clone();
        if self.kind == IndexKind::Native {
            let len = u16::try_from(derived.len()).map_err(|_| {
                NetabaseError::InvalidKey(format!(
                    "index {} key of {} bytes exceeds {}",
                    self.name,
                    derived.len(),
                    u16::MAX
                ))
            })?;
            key.extend_from_slice(&len.to_be_bytes());
        }
        key.extend_from_slice(derived);
        Ok(key)
    }

    fn native_entry(&self, derived: &[u8], primary: &[u8]) -> NetabaseResult<Vec<u8>> {
        let mut key = self.entry_prefix(derived)?;
        key.extend_from_slice(primary);
        Ok(key)
    }

    /// Primary keys indexed under `derived`, in ascending byte order.
    pub fn primary_keys<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        derived: &[u8],
    ) -> NetabaseResult<Vec<Vec<u8>>> {
        self.keys_iter(db, derived)?.collect()
    }

    /// Stream the primary keys indexed under `derived`.
    ///
    /// Native indexes read lazily from the store; compact indexes decode the
    /// single entry up front.
    pub fn keys_iter<'a, S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &'a S,
        derived: &[u8],
    ) -> NetabaseResult<IndexKeys<'a>> {
        let start = self.entry_prefix(derived)?;
        match self.kind {
            IndexKind::Compact => {
                let refs = MultiRef::decode_refs(db.get(&start)?)?;
                Ok(Box::new(refs.into_iter().map(Ok)))
            }
            IndexKind::Native => {
                let skip = start.len();
                let end = prefix_end(&start);
                let iter = db.iterator(&start, end.as_deref())?;
                Ok(Box::new(iter.map(move |kv| kv.map(|(key, _)| key[skip..].to_vec()))))
            }
        }
    }

    /// Queue the index mutations for `primary` changing from `old` to `new`.
    ///
    /// Keys present in both versions are left alone. Retractions are queued
    /// before insertions. Fails with [`NetabaseError::Duplicate`] if a unique
    /// key already belongs to another primary key; the batch must then be
    /// discarded.
    pub fn plan_update<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        primary: &[u8],
        old: Option<&dyn Model>,
        new: Option<&dyn Model>,
        batch: &mut Batch,
    ) -> NetabaseResult<()> {
        let old_keys = match old {
            Some(model) => self.derived_keys(model)?,
            None => BTreeSet::new(),
        };
        let new_keys = match new {
            Some(model) => self.derived_keys(model)?,
            None => BTreeSet::new(),
        };

        match self.kind {
            IndexKind::Native => {
                for derived in old_keys.difference(&new_keys) {
                    batch.delete(self.native_entry(derived, primary)?);
                }
                for derived in new_keys.difference(&old_keys) {
                    batch.set(self.native_entry(derived, primary)?, primary.to_vec());
                }
            }
            IndexKind::Compact => {
                for derived in old_keys.difference(&new_keys) {
                    let entry = self.entry_prefix(derived)?;
                    let mut refs = MultiRef::decode_refs(db.get(&entry)?)?;
                    if MultiRef::remove(&mut refs, primary) {
                        Self::queue_refs(batch, entry, refs);
                    }
                }
                for derived in new_keys.difference(&old_keys) {
                    let entry = self.entry_prefix(derived)?;
                    let mut refs = MultiRef::decode_refs(db.get(&entry)?)?;
                    if self.unique && refs.iter().any(|r| r.as_slice() != primary) {
                        return Err(NetabaseError::Duplicate(format!(
                            "{}.{} already holds key {:?}",
                            self.bucket, self.name, derived
                        )));
                    }
                    if MultiRef::insert(&mut refs, primary) {
                        Self::queue_refs(batch, entry, refs);
                    }
                }
            }
        }
        Ok(())
    }

    fn queue_refs(batch: &mut Batch, entry: Vec<u8>, refs: Vec<Vec<u8>>) {
        if refs.is_empty() {
            batch.delete(entry);
        } else {
            batch.set(entry, MultiRef { refs }.encode_to_vec());
        }
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("bucket", &self.bucket)
            .field("unique", &self.unique)
            .field("kind", &self.kind)
            .finish()
    }
}
