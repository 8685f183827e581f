//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits,
//! allowing users to get started quickly with a single import.
//!
//! # Usage
//!
//! ```rust
//! use netabase_orm::prelude::*;
//!
//! let store = MemoryStore::new();
//! assert!(store.is_empty());
//! ```
//!
//! # What's Included
//!
//! ## Core Traits
//!
//! - [`Model`]: capability set of every stored value
//! - [`Migratable`]: models carrying a schema version
//! - [`ReadOnlyKvStore`] / [`KvStore`]: the store interface
//!
//! ## Buckets and Indexes
//!
//! - [`ModelBucket`], [`Bucket`], [`Object`], [`Indexer`], [`Sequence`]
//! - [`iter_all`] for resumable full-bucket scans
//! - [`QueryRouter`] and [`QueryMode`] for read-only lookups
//!
//! ## Migration
//!
//! - [`MigrationRegistry`], [`Metadata`], [`Schema`], [`UpgradeSchemaMsg`],
//!   [`UpgradeSchemaHandler`]
//!
//! ## Encoding
//!
//! - [`codec`] helpers and bincode's [`Encode`] / [`Decode`] derives

pub use crate::codec;
pub use crate::config::{MemoryConfig, StoreConfig};
pub use crate::databases::MemoryStore;
#[cfg(feature = "sled")]
pub use crate::databases::SledStore;
pub use crate::error::{ErrorKind, NetabaseError, NetabaseResult};
pub use crate::migration::{
    Metadata, MigrationRegistry, RegistryBuilder, Schema, UpgradeSchemaHandler, UpgradeSchemaMsg,
    genesis, no_modification,
};
pub use crate::orm::{
    Bucket, Index, IndexKind, Indexer, ModelBucket, ModelBucketIterator, ModelSink, Object,
    QueryMode, QueryRouter, Sequence, iter_all,
};
pub use crate::traits::migration::{Migratable, Migrator};
pub use crate::traits::model::{Model, ModelFactory};
pub use crate::traits::store::{Batch, KvStore, ReadOnlyKvStore};

pub use bincode::{Decode, Encode};
