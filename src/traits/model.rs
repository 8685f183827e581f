//! The model capability set and the type-erased prototype used by buckets.

use std::any::{Any, TypeId};
use std::fmt::Debug;

use crate::error::NetabaseResult;

/// Runtime type access for values stored behind `dyn Model`.
///
/// Implemented for every sized `'static` type; never implement it by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Trait for entities that can be stored in a bucket.
///
/// A model owns its encoding: the store never interprets the bytes. Identity
/// is external: the storage key is not part of the model.
///
/// # Example
///
/// ```
/// use netabase_orm::codec;
/// use netabase_orm::error::{NetabaseError, NetabaseResult};
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
///
///     fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
///         *self = codec::decode(bytes)?;
///         Ok(())
///     }
///
///     fn validate(&self) -> NetabaseResult<()> {
///         if self.owner.is_empty() {
///             return Err(NetabaseError::Input("owner is required".into()));
///         }
///         Ok(())
///     }
/// }
///
/// let c = Counter { owner: "alice".into(), value: 1 };
/// let mut back = Counter::default();
/// back.unmarshal(&c.marshal().unwrap()).unwrap();
/// assert_eq!(back, c);
/// ```
pub trait Model: AsAny + Send + Sync + Debug {
    fn marshal(&self) -> NetabaseResult<Vec<u8>>;

    /// Replace the content of `self` with the decoded `bytes`.
    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()>;

    fn validate(&self) -> NetabaseResult<()>;
}

/// Constructs empty instances of one model type.
///
/// An untyped [`Bucket`](crate::orm::Bucket) decodes stored bytes through its
/// factory; typed wrappers compare the factory's type id with their own.
#[derive(Clone, Copy)]
pub struct ModelFactory {
    type_id: TypeId,
    type_name: &'static str,
    make: fn() -> Box<dyn Model>,
}

fn make_default<M: Model + Default>() -> Box<dyn Model> {
    Box::new(M::default())
}

impl ModelFactory {
    pub fn of<M: Model + Default>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            make: make_default::<M>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<M: Any>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// A fresh, empty model instance.
    pub fn create(&self) -> Box<dyn Model> {
        (self.make)()
    }

    /// Decode `bytes` into a fresh model instance.
    pub fn decode(&self, bytes: &[u8]) -> NetabaseResult<Box<dyn Model>> {
        let mut model = self.create();
        model.unmarshal(bytes)?;
        Ok(model)
    }
}

impl Debug for ModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFactory")
            .field("type_name", &self.type_name)
            .finish()
    }
}
