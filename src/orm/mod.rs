//! Object mapping over an ordered key-value store.
//!
//! The storage layout inside the store is:
//!
//! | namespace                  | content                                  |
//! |----------------------------|------------------------------------------|
//! | `<bucket>:<key>`           | model bytes                              |
//! | `_i.<bucket>.<index>:...`  | secondary index entries                  |
//! | `_s.<bucket>:<name>`       | sequence counters                        |
//! | `_c:<package>`             | package configuration                    |
//!
//! Bucket and index names are restricted to `[a-z_]`, so no bucket
//! namespace can overlap the reserved `_i.`, `_s.` and `_c:` ones.

pub mod bucket;
pub mod conf;
pub mod index;
pub mod iterator;
pub mod model_bucket;
pub mod object;
pub mod query;
pub mod sequence;

pub use bucket::{Bucket, KEY_UPPER_BOUND, validate_name};
pub use conf::{load_config, save_config};
pub use index::{Index, IndexKind, Indexer, MultiRef};
pub use iterator::{ModelBucketIterator, iter_all};
pub use model_bucket::{ID_SEQUENCE, ModelBucket, ModelBucketBuilder, ModelSink};
pub use object::Object;
pub use query::{BucketQuery, IndexQuery, QueryHandler, QueryMode, QueryRouter};
pub use sequence::Sequence;
