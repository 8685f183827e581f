//! # Netabase ORM
//!
//! The object storage layer of a blockchain state machine: typed models
//! mapped onto an ordered key-value store, with secondary indexes, id
//! sequences and per-package schema versioning.
//!
//! Every operation is deterministic. Given the same store contents and the
//! same calls, every node produces the same bytes.
//!
//! ## Features
//!
//! - **Typed buckets**: [`ModelBucket<M>`](orm::ModelBucket) stores and loads
//!   concrete model types with runtime type checks at the untyped boundary
//! - **Secondary indexes**: unique and non-unique, packed (compact) or one
//!   entry per reference (native), maintained in the same atomic batch as
//!   the primary write
//! - **Sequences**: persistent counters minting big-endian ids
//! - **Schema migration**: a frozen registry of per-version migration steps,
//!   on-chain accepted versions and an administrator-driven upgrade message
//! - **Backends**: in-memory `BTreeMap` and sled
//!
//! ## Quick Start
//!
//! ```rust
//! use netabase_orm::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
//! struct Counter {
//!     owner: String,
//!     value: u64,
//! }
//!
//! impl Model for Counter {
//!     fn marshal(&self) -> NetabaseResult<Vec<u8>> {
//!         codec::encode(self)
//!     }
//!
//!     fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
//!         *self = codec::decode(bytes)?;
//!         Ok(())
//!     }
//!
//!     fn validate(&self) -> NetabaseResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! let counters = ModelBucket::<Counter>::new("cnt")?;
//! let mut store = MemoryStore::new();
//!
//! let first = counters.put(&mut store, &[], Counter { owner: "alice".into(), value: 1 })?;
//! let second = counters.put(&mut store, &[], Counter { owner: "bob".into(), value: 2 })?;
//! assert_eq!(first, vec![0, 0, 0, 0, 0, 0, 0, 1]);
//! assert_eq!(second, vec![0, 0, 0, 0, 0, 0, 0, 2]);
//!
//! let mut loaded = Counter::default();
//! counters.one(&store, &first, &mut loaded)?;
//! assert_eq!(loaded.owner, "alice");
//! # Ok::<(), NetabaseError>(())
//! ```

pub mod codec;
pub mod config;
pub mod databases;
pub mod error;
pub mod migration;
pub mod orm;
pub mod prelude;
pub mod traits;

pub use error::{NetabaseError, NetabaseResult};
