//! Schema versioning of stored models.
//!
//! Each package has a schema version accepted by the chain, stored in the
//! [`SchemaBucket`]. Buckets built with
//! [`with_migration`](crate::orm::ModelBucketBuilder::with_migration) refuse
//! models stamped with a newer version. Older models are brought forward
//! explicitly with [`MigrationRegistry::migrate`]. The administrator moves a
//! package forward one version at a time with an [`UpgradeSchemaMsg`].

pub mod handler;
pub mod messages;
pub mod registry;
pub mod schema;

pub use handler::{UpgradeSchemaHandler, genesis, load_configuration};
pub use messages::{
    ADDRESS_LEN, Configuration, MIGRATION_PACKAGE, Metadata, Schema, UpgradeSchemaMsg,
    validate_address, validate_metadata,
};
pub use registry::{MigrationRegistry, RegistryBuilder, no_modification};
pub use schema::{PACKAGE_INDEX, SCHEMA_BUCKET, SchemaBucket};
