//! Untyped buckets.
//!
//! A bucket owns the key namespace `<name>:` and decodes every value through
//! its [`ModelFactory`]. Saving or deleting an object updates the primary
//! entry and every registered index in one atomic batch.

use std::collections::BTreeMap;

use log::{trace, warn};

use super::index::{Index, Indexer};
use super::object::Object;
use super::query::{BucketQuery, IndexQuery, QueryRouter};
use super::sequence::Sequence;
use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::model::ModelFactory;
use crate::traits::store::{Batch, KvStore, ReadOnlyKvStore};

/// Raw keys at or beyond this value would sort past a bucket's iteration
/// bound and are refused on save.
pub const KEY_UPPER_BOUND: [u8; 7] = [0xFF; 7];

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 20;

/// Check a bucket or index name: 3 to 20 characters from `[a-z_]`.
pub fn validate_name(name: &str) -> NetabaseResult<()> {
    let valid = (NAME_MIN..=NAME_MAX).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(NetabaseError::InvalidKey(format!(
            "name {name:?} must match [a-z_]{{{NAME_MIN},{NAME_MAX}}}"
        )))
    }
}

/// Storage prefix of the bucket called `name`.
pub fn bucket_prefix(name: &str) -> Vec<u8> {
    format!("{name}:").into_bytes()
}

/// A named collection of objects of one model type.
#[derive(Clone, Debug)]
pub struct Bucket {
    name: String,
    prefix: Vec<u8>,
    factory: ModelFactory,
    indexes: BTreeMap<String, Index>,
}

impl Bucket {
    pub fn new(name: &str, factory: ModelFactory) -> NetabaseResult<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            prefix: bucket_prefix(name),
            factory,
            indexes: BTreeMap::new(),
        })
    }

    /// Add a compact index, optionally unique.
    pub fn with_index(self, name: &str, indexer: Indexer, unique: bool) -> NetabaseResult<Self> {
        let index = Index::compact(&self.name, name, indexer, unique);
        self.add_index(index)
    }

    /// Add a native (non-unique) index.
    pub fn with_native_index(self, name: &str, indexer: Indexer) -> NetabaseResult<Self> {
        let index = Index::native(&self.name, name, indexer);
        self.add_index(index)
    }

    fn add_index(mut self, index: Index) -> NetabaseResult<Self> {
        validate_name(index.name())?;
        if self.indexes.contains_key(index.name()) {
            return Err(NetabaseError::InvalidIndex(format!(
                "{} already has an index named {}",
                self.name,
                index.name()
            )));
        }
        self.indexes.insert(index.name().to_string(), index);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn factory(&self) -> &ModelFactory {
        &self.factory
    }

    /// Full storage key of the raw primary key `key`.
    pub fn db_key(&self, key: &[u8]) -> Vec<u8> {
        let mut db_key = Vec::with_capacity(self.prefix.len() + key.len());
        db_key.extend_from_slice(&self.prefix);
        db_key.extend_from_slice(key);
        db_key
    }

    pub fn index(&self, name: &str) -> NetabaseResult<&Index> {
        self.indexes
            .get(name)
            .ok_or_else(|| NetabaseError::InvalidIndex(format!("{}.{}", self.name, name)))
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    /// A sequence scoped to this bucket.
    pub fn sequence(&self, name: &str) -> Sequence {
        Sequence::new(&self.name, name)
    }

    /// Load the object stored under `key`, `None` if absent.
    pub fn get<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        key: &[u8],
    ) -> NetabaseResult<Option<Object>> {
        match db.get(&self.db_key(key))? {
            None => Ok(None),
            Some(raw) => Ok(Some(Object::new(key, self.factory.decode(&raw)?))),
        }
    }

    /// Persist `obj` and bring every index up to date.
    ///
    /// Nothing is written unless every index accepts the new value.
    pub fn save<S: KvStore + ?Sized>(&self, db: &mut S, obj: &Object) -> NetabaseResult<()> {
        let key = obj.key();
        if key.is_empty() {
            return Err(NetabaseError::InvalidKey(format!("empty key in {}", self.name)));
        }
        if key >= KEY_UPPER_BOUND.as_slice() {
            return Err(NetabaseError::InvalidKey(format!(
                "key {key:?} in {} sorts past the iteration bound",
                self.name
            )));
        }
        let value = obj.value();
        if value.as_any().type_id() != self.factory.type_id() {
            return Err(NetabaseError::TypeMismatch(format!(
                "{} stores {}, got {}",
                self.name,
                self.factory.type_name(),
                value.type_name()
            )));
        }
        obj.validate()?;

        let mut batch = Batch::new();
        batch.set(self.db_key(key), value.marshal()?);

        if !self.indexes.is_empty() {
            let old = self.get(&*db, key)?;
            let old = old.as_ref().map(Object::value);
            for index in self.indexes.values() {
                index.plan_update(&*db, key, old, Some(value), &mut batch)?;
            }
        }

        trace!("{}: saving {:?} with {} writes", self.name, key, batch.len());
        db.write_batch(batch)
    }

    /// Remove the object under `key` and its index entries.
    ///
    /// Deleting a missing key is a no-op.
    pub fn delete<S: KvStore + ?Sized>(&self, db: &mut S, key: &[u8]) -> NetabaseResult<()> {
        let Some(old) = self.get(&*db, key)? else {
            return Ok(());
        };

        let mut batch = Batch::new();
        batch.delete(self.db_key(key));
        for index in self.indexes.values() {
            index.plan_update(&*db, key, Some(old.value()), None, &mut batch)?;
        }
        db.write_batch(batch)
    }

    /// Objects indexed under `derived` by the index `index_name`.
    ///
    /// Index references whose primary entry is missing are skipped.
    pub fn get_indexed<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        index_name: &str,
        derived: &[u8],
    ) -> NetabaseResult<Vec<Object>> {
        let index = self.index(index_name)?;
        let mut objects = Vec::new();
        for primary in index.keys_iter(db, derived)? {
            let primary = primary?;
            match self.get(db, &primary)? {
                Some(obj) => objects.push(obj),
                None => warn!(
                    "{}.{}: dangling reference to {:?}",
                    self.name, index_name, primary
                ),
            }
        }
        Ok(objects)
    }

    /// Expose the bucket and its indexes on `router`.
    ///
    /// The bucket answers at `name`, each index at `name/<index>`.
    pub fn register(&self, name: &str, router: &mut QueryRouter) -> NetabaseResult<()> {
        router.register(name, BucketQuery::new(self.prefix.clone()))?;
        for index in self.indexes.values() {
            router.register(
                &format!("{name}/{}", index.name()),
                IndexQuery::new(self.clone(), index.name()),
            )?;
        }
        Ok(())
    }
}
