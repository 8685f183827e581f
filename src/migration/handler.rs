//! Schema upgrades and migration genesis.

use std::sync::Arc;

use log::{debug, info};

use super::messages::{Configuration, MIGRATION_PACKAGE, Schema, UpgradeSchemaMsg};
use super::registry::MigrationRegistry;
use crate::error::{NetabaseError, NetabaseResult};
use crate::orm::conf::{load_config, save_config};
use crate::traits::model::Model;
use crate::traits::store::{KvStore, ReadOnlyKvStore};

/// Load the migration package configuration.
pub fn load_configuration<S: ReadOnlyKvStore + ?Sized>(db: &S) -> NetabaseResult<Configuration> {
    load_config(db, MIGRATION_PACKAGE)
}

/// Initialise the migration state of a new chain.
///
/// Stores `admin` as the upgrade administrator and accepts version 1 of
/// every registered package that has no schema yet. Running it again with
/// the same administrator only initialises newly registered packages; a
/// different administrator is refused with [`NetabaseError::Duplicate`].
pub fn genesis<S: KvStore + ?Sized>(
    db: &mut S,
    registry: &MigrationRegistry,
    admin: &[u8],
) -> NetabaseResult<()> {
    match load_configuration(&*db) {
        Ok(conf) if conf.admin.as_slice() == admin => {
            debug!("migration genesis: administrator already configured");
        }
        Ok(_) => {
            return Err(NetabaseError::Duplicate(
                "migration administrator is already configured".into(),
            ));
        }
        Err(err) if err.is_not_found() => {
            let conf = Configuration {
                admin: admin.to_vec(),
            };
            save_config(db, MIGRATION_PACKAGE, &conf)?;
        }
        Err(err) => return Err(err),
    }

    let schemas = registry.schema_bucket();
    for package in registry.packages() {
        if schemas.next_version(&*db, package)? == 1 {
            schemas.save(db, Schema::new(package, 1))?;
        }
    }
    info!("migration genesis: {} packages", registry.packages().count());
    Ok(())
}

/// Applies [`UpgradeSchemaMsg`] requests.
#[derive(Debug, Clone)]
pub struct UpgradeSchemaHandler {
    registry: Arc<MigrationRegistry>,
}

impl UpgradeSchemaHandler {
    pub fn new(registry: Arc<MigrationRegistry>) -> Self {
        Self { registry }
    }

    /// Verify that `signer` may apply `msg` without writing anything.
    ///
    /// The signer must be the configured administrator and the target
    /// version must be the next one for the package, within the versions
    /// this node has migrations for.
    pub fn check<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        signer: &[u8],
        msg: &UpgradeSchemaMsg,
    ) -> NetabaseResult<()> {
        msg.validate().map_err(NetabaseError::validation)?;

        let conf = load_configuration(db)?;
        if signer != conf.admin.as_slice() {
            return Err(NetabaseError::InvalidUpgrade(
                "signer is not the migration administrator".into(),
            ));
        }

        let expected = self.registry.schema_bucket().next_version(db, &msg.pkg)?;
        if msg.to_version != expected {
            return Err(NetabaseError::InvalidUpgrade(format!(
                "package {} can only move to v{expected}, not v{}",
                msg.pkg, msg.to_version
            )));
        }

        match self.registry.max_version(&msg.pkg) {
            Some(max) if msg.to_version <= max => Ok(()),
            Some(max) => Err(NetabaseError::InvalidUpgrade(format!(
                "package {} has migrations up to v{max} only",
                msg.pkg
            ))),
            None => Err(NetabaseError::InvalidUpgrade(format!(
                "package {} is not registered",
                msg.pkg
            ))),
        }
    }

    /// Check `msg` and record the new schema version.
    pub fn deliver<S: KvStore + ?Sized>(
        &self,
        db: &mut S,
        signer: &[u8],
        msg: &UpgradeSchemaMsg,
    ) -> NetabaseResult<Schema> {
        self.check(&*db, signer, msg)?;
        let schema = Schema::new(&msg.pkg, msg.to_version);
        self.registry.schema_bucket().save(db, schema.clone())?;
        debug!("upgrade: package {} moved to v{}", msg.pkg, msg.to_version);
        Ok(schema)
    }
}
