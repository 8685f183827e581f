//! Traits for models that take part in schema migration.
//!
//! A migratable model belongs to a package and carries a [`Metadata`] field
//! recording the schema version it was written with. Buckets configured with
//! a migration registry refuse to hand out data written by a newer schema
//! than the one the chain currently accepts.

use crate::migration::Metadata;
use crate::traits::model::Model;

pub trait Migratable: Model + Sized {
    /// Package the model belongs to. Schema versions are tracked per package.
    const PACKAGE: &'static str;

    fn metadata(&self) -> Option<&Metadata>;

    /// Metadata of the model, created with the default value when missing.
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Schema version recorded in the metadata, `0` when there is none.
    fn schema_version(&self) -> u32 {
        self.metadata().map(|m| m.schema).unwrap_or(0)
    }
}

/// A single forward migration step applied to a model in place.
///
/// Steps must be deterministic and pure: every node running the same step on
/// the same value must produce the same result.
pub type Migrator<M> = fn(&mut M) -> crate::error::NetabaseResult<()>;
