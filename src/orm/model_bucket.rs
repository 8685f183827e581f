//! Typed buckets.
//!
//! [`ModelBucket`] wraps an untyped [`Bucket`] bound to one model type and
//! hides the conversion between stored objects and concrete models. It also
//! owns the id sequence used when a model is stored without a key, and,
//! when built with a migration registry, refuses to hand out or store
//! models whose schema version is newer than the chain accepts.

use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;

use super::bucket::Bucket;
use super::index::{Index, Indexer};
use super::iterator::{ModelBucketIterator, iter_all};
use super::object::Object;
use super::query::QueryRouter;
use super::sequence::Sequence;
use crate::error::{NetabaseError, NetabaseResult};
use crate::migration::MigrationRegistry;
use crate::traits::migration::Migratable;
use crate::traits::model::{Model, ModelFactory};
use crate::traits::store::{KvStore, ReadOnlyKvStore};

/// Name of the default id sequence.
pub const ID_SEQUENCE: &str = "id";

/// Destination of [`ModelBucket::by_index`].
///
/// Implemented for vectors of models, boxed models and shared models.
pub trait ModelSink<M> {
    fn push_model(&mut self, model: M);
}

impl<M> ModelSink<M> for Vec<M> {
    fn push_model(&mut self, model: M) {
        self.push(model);
    }
}

impl<M> ModelSink<M> for Vec<Box<M>> {
    fn push_model(&mut self, model: M) {
        self.push(Box::new(model));
    }
}

impl<M> ModelSink<M> for Vec<Arc<M>> {
    fn push_model(&mut self, model: M) {
        self.push(Arc::new(model));
    }
}

/// Schema guard of a bucket holding migratable models.
struct SchemaGuard<M> {
    registry: Arc<MigrationRegistry>,
    package: &'static str,
    version_of: fn(&M) -> u32,
}

impl<M> Clone for SchemaGuard<M> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            package: self.package,
            version_of: self.version_of,
        }
    }
}

impl<M> SchemaGuard<M> {
    fn new(registry: Arc<MigrationRegistry>) -> Self
    where
        M: Migratable,
    {
        Self {
            registry,
            package: M::PACKAGE,
            version_of: M::schema_version,
        }
    }

    fn check<S: ReadOnlyKvStore + ?Sized>(&self, db: &S, model: &M) -> NetabaseResult<()> {
        let found = (self.version_of)(model);
        let supported = self.registry.current_version(db, self.package)?;
        if found > supported {
            return Err(NetabaseError::SchemaTooNew {
                package: self.package.to_string(),
                found,
                supported,
            });
        }
        Ok(())
    }
}

/// A bucket storing models of type `M`.
///
/// # Example
///
/// ```
/// use netabase_orm::codec;
/// use netabase_orm::databases::MemoryStore;
/// use netabase_orm::error::NetabaseResult;
/// use netabase_orm::orm::{Indexer, ModelBucket};
/// use netabase_orm::traits::model::Model;
///
/// #[derive(Debug, Clone, Default, PartialEq, bincode::Encode, bincode::Decode)]
/// struct Counter {
///     owner: String,
///     value: u64,
/// }
///
/// impl Model for Counter {
///     fn marshal(&self) -> NetabaseResult<Vec<u8>> {
///         codec::encode(self)
///     }
///     fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
///         *self = codec::decode(bytes)?;
///         Ok(())
///     }
///     fn validate(&self) -> NetabaseResult<()> {
///         Ok(())
///     }
/// }
///
/// let counters = ModelBucket::<Counter>::builder("cnt")
///     .with_index(
///         "owner",
///         Indexer::single(|c: &Counter| Ok(Some(c.owner.clone().into_bytes()))),
///         false,
///     )
///     .build()
///     .unwrap();
///
/// let mut db = MemoryStore::new();
/// let key = counters
///     .put(&mut db, &[], Counter { owner: "alice".into(), value: 1 })
///     .unwrap();
/// assert_eq!(key, 1u64.to_be_bytes().to_vec());
///
/// let mut found: Vec<Counter> = Vec::new();
/// counters.by_index(&db, "owner", b"alice", &mut found).unwrap();
/// assert_eq!(found[0].value, 1);
/// ```
pub struct ModelBucket<M> {
    bucket: Bucket,
    id_seq: Sequence,
    schema: Option<SchemaGuard<M>>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for ModelBucket<M> {
    fn clone(&self) -> Self {
        Self {
            bucket: self.bucket.clone(),
            id_seq: self.id_seq.clone(),
            schema: self.schema.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for ModelBucket<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBucket")
            .field("bucket", &self.bucket)
            .field("id_seq", &self.id_seq)
            .field("schema", &self.schema.as_ref().map(|s| s.package))
            .finish()
    }
}

impl<M: Model + Default> ModelBucket<M> {
    pub fn builder(name: &str) -> ModelBucketBuilder<M> {
        ModelBucketBuilder {
            name: name.to_string(),
            indexes: Vec::new(),
            id_seq: None,
            schema: None,
        }
    }

    /// A bucket without indexes using the default id sequence.
    pub fn new(name: &str) -> NetabaseResult<Self> {
        Self::builder(name).build()
    }
}

impl<M: Model> ModelBucket<M> {
    /// Wrap an existing bucket. Fails if it is configured for another model.
    pub fn from_bucket(bucket: Bucket) -> NetabaseResult<Self> {
        if !bucket.factory().is::<M>() {
            return Err(NetabaseError::TypeMismatch(format!(
                "bucket {} stores {}, not {}",
                bucket.name(),
                bucket.factory().type_name(),
                std::any::type_name::<M>()
            )));
        }
        let id_seq = bucket.sequence(ID_SEQUENCE);
        Ok(Self {
            bucket,
            id_seq,
            schema: None,
            _model: PhantomData,
        })
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn name(&self) -> &str {
        self.bucket.name()
    }

    pub fn id_sequence(&self) -> &Sequence {
        &self.id_seq
    }

    pub fn index(&self, name: &str) -> NetabaseResult<&Index> {
        self.bucket.index(name)
    }

    /// Iterate over every model of the bucket in key order.
    pub fn iter_all(&self) -> ModelBucketIterator {
        iter_all(self.bucket.name())
    }

    fn to_model(obj: Object) -> NetabaseResult<M> {
        obj.into_model::<M>()
    }

    fn check_schema<S: ReadOnlyKvStore + ?Sized>(&self, db: &S, model: &M) -> NetabaseResult<()> {
        match &self.schema {
            Some(guard) => guard.check(db, model),
            None => Ok(()),
        }
    }

    /// Load the model stored under `key` into `dest`.
    ///
    /// `dest` is left untouched on any error.
    pub fn one<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        key: &[u8],
        dest: &mut M,
    ) -> NetabaseResult<()> {
        let obj = self.bucket.get(db, key)?.ok_or_else(|| {
            NetabaseError::NotFound(format!("{} {:?}", std::any::type_name::<M>(), key))
        })?;
        let model = Self::to_model(obj)?;
        self.check_schema(db, &model)?;
        *dest = model;
        Ok(())
    }

    /// Append every model indexed under `key` to `dest`, returning their
    /// primary keys in index order.
    ///
    /// Nothing is appended unless every match loads and passes the schema
    /// check.
    pub fn by_index<S, D>(
        &self,
        db: &S,
        index_name: &str,
        key: &[u8],
        dest: &mut D,
    ) -> NetabaseResult<Vec<Vec<u8>>>
    where
        S: ReadOnlyKvStore + ?Sized,
        D: ModelSink<M>,
    {
        let objects = self.bucket.get_indexed(db, index_name, key)?;
        let mut keys = Vec::with_capacity(objects.len());
        let mut models = Vec::with_capacity(objects.len());
        for obj in objects {
            keys.push(obj.key().to_vec());
            let model = Self::to_model(obj)?;
            self.check_schema(db, &model)?;
            models.push(model);
        }
        for model in models {
            dest.push_model(model);
        }
        Ok(keys)
    }

    /// Store `model` under `key`, or under the next id of the sequence when
    /// `key` is empty. Returns the key used.
    ///
    /// A generated id is consumed even if the save fails afterwards.
    pub fn put<S: KvStore + ?Sized>(
        &self,
        db: &mut S,
        key: &[u8],
        model: M,
    ) -> NetabaseResult<Vec<u8>> {
        self.check_schema(&*db, &model)?;
        model.validate().map_err(NetabaseError::validation)?;

        let key = if key.is_empty() {
            let id = self.id_seq.next_val(db)?;
            debug!("{}: generated id {:?}", self.bucket.name(), id);
            id
        } else {
            key.to_vec()
        };

        self.bucket.save(db, &Object::from_model(key.clone(), model))?;
        Ok(key)
    }

    /// Remove the model under `key`. Fails with `NotFound` if absent.
    pub fn delete<S: KvStore + ?Sized>(&self, db: &mut S, key: &[u8]) -> NetabaseResult<()> {
        self.has(&*db, key)?;
        self.bucket.delete(db, key)
    }

    /// Succeeds iff a model is stored under `key`.
    pub fn has<S: ReadOnlyKvStore + ?Sized>(&self, db: &S, key: &[u8]) -> NetabaseResult<()> {
        if key.is_empty() {
            return Err(NetabaseError::NotFound("empty key".into()));
        }
        if db.has(&self.bucket.db_key(key))? {
            Ok(())
        } else {
            Err(NetabaseError::NotFound(format!(
                "{} {:?}",
                std::any::type_name::<M>(),
                key
            )))
        }
    }

    /// Expose the bucket and its indexes on `router`.
    pub fn register(&self, name: &str, router: &mut QueryRouter) -> NetabaseResult<()> {
        self.bucket.register(name, router)
    }
}

enum IndexSpec {
    Compact { name: String, indexer: Indexer, unique: bool },
    Native { name: String, indexer: Indexer },
}

/// Collects the options of a [`ModelBucket`]; configuration errors surface
/// from [`build`](ModelBucketBuilder::build).
pub struct ModelBucketBuilder<M> {
    name: String,
    indexes: Vec<IndexSpec>,
    id_seq: Option<Sequence>,
    schema: Option<SchemaGuard<M>>,
}

impl<M: Model + Default> ModelBucketBuilder<M> {
    /// Add a compact index, optionally unique.
    pub fn with_index(mut self, name: &str, indexer: Indexer, unique: bool) -> Self {
        self.indexes.push(IndexSpec::Compact {
            name: name.to_string(),
            indexer,
            unique,
        });
        self
    }

    /// Add a native index. Native indexes are never unique.
    pub fn with_native_index(mut self, name: &str, indexer: Indexer) -> Self {
        self.indexes.push(IndexSpec::Native {
            name: name.to_string(),
            indexer,
        });
        self
    }

    /// Generate ids from `seq` instead of the bucket's own `id` sequence.
    ///
    /// Buckets built with the same sequence share one counter.
    pub fn with_id_sequence(mut self, seq: Sequence) -> Self {
        self.id_seq = Some(seq);
        self
    }

    /// Check the schema version of every model read or written against the
    /// current version of `M::PACKAGE`.
    pub fn with_migration(mut self, registry: Arc<MigrationRegistry>) -> Self
    where
        M: Migratable,
    {
        self.schema = Some(SchemaGuard::new(registry));
        self
    }

    pub fn build(self) -> NetabaseResult<ModelBucket<M>> {
        let mut bucket = Bucket::new(&self.name, ModelFactory::of::<M>())?;
        for spec in self.indexes {
            bucket = match spec {
                IndexSpec::Compact {
                    name,
                    indexer,
                    unique,
                } => bucket.with_index(&name, indexer, unique)?,
                IndexSpec::Native { name, indexer } => bucket.with_native_index(&name, indexer)?,
            };
        }
        let id_seq = self
            .id_seq
            .unwrap_or_else(|| bucket.sequence(ID_SEQUENCE));
        Ok(ModelBucket {
            bucket,
            id_seq,
            schema: self.schema,
            _model: PhantomData,
        })
    }
}
