//! A keyed model instance, the unit an untyped [`Bucket`](super::Bucket)
//! reads and writes.

use std::fmt;

use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::model::Model;

/// A model value together with its raw (un-prefixed) primary key.
pub struct Object {
    key: Vec<u8>,
    value: Box<dyn Model>,
}

impl Object {
    pub fn new(key: impl Into<Vec<u8>>, value: Box<dyn Model>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Wrap a concrete model.
    pub fn from_model<M: Model>(key: impl Into<Vec<u8>>, model: M) -> Self {
        Self::new(key, Box::new(model))
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &dyn Model {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> &mut dyn Model {
        self.value.as_mut()
    }

    pub fn set_key(&mut self, key: impl Into<Vec<u8>>) {
        self.key = key.into();
    }

    pub fn into_parts(self) -> (Vec<u8>, Box<dyn Model>) {
        (self.key, self.value)
    }

    /// Borrow the value as `M`, `None` if it holds another type.
    pub fn downcast_ref<M: Model>(&self) -> Option<&M> {
        (*self.value).as_any().downcast_ref::<M>()
    }

    /// Take the value out as `M`.
    pub fn into_model<M: Model>(self) -> NetabaseResult<M> {
        let found = (*self.value).type_name();
        match self.value.into_any().downcast::<M>() {
            Ok(model) => Ok(*model),
            Err(_) => Err(NetabaseError::TypeMismatch(format!(
                "expected {}, found {}",
                std::any::type_name::<M>(),
                found
            ))),
        }
    }

    /// Check that the object can be persisted: a non-empty key and a value
    /// that passes its own validation.
    pub fn validate(&self) -> NetabaseResult<()> {
        if self.key.is_empty() {
            return Err(NetabaseError::InvalidKey("empty primary key".into()));
        }
        self.value.validate().map_err(NetabaseError::validation)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
