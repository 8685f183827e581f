//! The migration registry.
//!
//! Every migratable model type registers one step per schema version of its
//! package, starting at 1. The step registered for version `n` turns a model
//! written at `n - 1` into one valid at `n`; the version 1 step declares the
//! type and is never run.
//!
//! ```
//! use netabase_orm::migration::{MIGRATION_PACKAGE, MigrationRegistry};
//!
//! let registry = MigrationRegistry::builder().build().unwrap();
//! assert_eq!(registry.max_version(MIGRATION_PACKAGE), Some(1));
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use super::messages::Schema;
use super::schema::SchemaBucket;
use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::migration::{Migratable, Migrator};
use crate::traits::model::Model;
use crate::traits::store::ReadOnlyKvStore;

type Step = Box<dyn Fn(&mut dyn Model) -> NetabaseResult<()> + Send + Sync>;

struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    step: Step,
}

type PackageSteps = BTreeMap<u32, Vec<Registration>>;

/// Migrator for versions whose layout did not change.
pub fn no_modification<M: Migratable>(_model: &mut M) -> NetabaseResult<()> {
    Ok(())
}

/// Collects registrations before the registry is frozen.
pub struct RegistryBuilder {
    packages: BTreeMap<String, PackageSteps>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// A builder with the migration package's own models registered.
    pub fn new() -> Self {
        let mut builder = Self {
            packages: BTreeMap::new(),
        };
        builder.insert::<Schema>(1, no_modification::<Schema>);
        builder
    }

    /// Register `migrator` as the step producing version `version` of `M`.
    ///
    /// Versions of one model type must be registered in order without gaps,
    /// starting at 1. Any other registration fails and the registry must not
    /// be used.
    pub fn register<M: Migratable>(
        &mut self,
        version: u32,
        migrator: Migrator<M>,
    ) -> NetabaseResult<&mut Self> {
        let type_name = std::any::type_name::<M>();
        if version == 0 {
            return Err(NetabaseError::Registration(format!(
                "{type_name}: versions start at 1"
            )));
        }
        let last = self.last_version::<M>();
        if version <= last {
            return Err(NetabaseError::Registration(format!(
                "{type_name} v{version} of package {} is already registered",
                M::PACKAGE
            )));
        }
        if version != last + 1 {
            return Err(NetabaseError::Registration(format!(
                "{type_name} v{version} of package {} registered after v{last}",
                M::PACKAGE
            )));
        }
        self.insert(version, migrator);
        debug!("registry: {} v{} for package {}", type_name, version, M::PACKAGE);
        Ok(self)
    }

    fn last_version<M: Migratable>(&self) -> u32 {
        let type_id = TypeId::of::<M>();
        self.packages
            .get(M::PACKAGE)
            .and_then(|steps| {
                steps
                    .iter()
                    .rev()
                    .find(|(_, regs)| regs.iter().any(|r| r.type_id == type_id))
                    .map(|(version, _)| *version)
            })
            .unwrap_or(0)
    }

    fn insert<M: Migratable>(&mut self, version: u32, migrator: Migrator<M>) {
        let step = move |model: &mut dyn Model| -> NetabaseResult<()> {
            let found = (*model).type_name();
            let model = model.as_any_mut().downcast_mut::<M>().ok_or_else(|| {
                NetabaseError::TypeMismatch(format!(
                    "migration for {} applied to {found}",
                    std::any::type_name::<M>()
                ))
            })?;
            migrator(model)
        };
        self.packages
            .entry(M::PACKAGE.to_string())
            .or_default()
            .entry(version)
            .or_default()
            .push(Registration {
                type_id: TypeId::of::<M>(),
                type_name: std::any::type_name::<M>(),
                step: Box::new(step),
            });
    }

    /// Freeze the registry.
    pub fn build(self) -> NetabaseResult<MigrationRegistry> {
        let registry = MigrationRegistry {
            packages: self.packages,
            schema: SchemaBucket::new()?,
        };
        debug!("registry: built with packages {:?}", registry.packages().collect::<Vec<_>>());
        Ok(registry)
    }
}

/// Immutable table of migration steps per package and version, together
/// with access to the accepted schema versions stored on chain.
pub struct MigrationRegistry {
    packages: BTreeMap<String, PackageSteps>,
    schema: SchemaBucket,
}

impl MigrationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registered package names in ascending order.
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Highest version any model of `package` has a step for.
    pub fn max_version(&self, package: &str) -> Option<u32> {
        self.packages
            .get(package)
            .and_then(|steps| steps.keys().next_back().copied())
    }

    pub fn schema_bucket(&self) -> &SchemaBucket {
        &self.schema
    }

    /// Schema version the chain currently accepts for `package`.
    pub fn current_version<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        package: &str,
    ) -> NetabaseResult<u32> {
        self.schema.current_version(db, package)
    }

    fn step(&self, package: &str, type_id: TypeId, version: u32) -> Option<&Step> {
        self.packages
            .get(package)?
            .get(&version)?
            .iter()
            .find(|r| r.type_id == type_id)
            .map(|r| &r.step)
    }

    /// Bring `model` up to the current schema version of its package.
    ///
    /// Steps run on a copy; `model` is only replaced once every step
    /// succeeded. Returns the version the model is at afterwards.
    pub fn migrate<S, M>(&self, db: &S, model: &mut M) -> NetabaseResult<u32>
    where
        S: ReadOnlyKvStore + ?Sized,
        M: Migratable + Clone,
    {
        let current = self.current_version(db, M::PACKAGE)?;
        let found = model.schema_version();
        if found == 0 {
            return Err(NetabaseError::Input(format!(
                "{} has no schema metadata",
                std::any::type_name::<M>()
            )));
        }
        if found > current {
            return Err(NetabaseError::SchemaTooNew {
                package: M::PACKAGE.to_string(),
                found,
                supported: current,
            });
        }
        if found == current {
            return Ok(current);
        }

        let mut working = model.clone();
        for version in found + 1..=current {
            let step = self
                .step(M::PACKAGE, TypeId::of::<M>(), version)
                .ok_or_else(|| NetabaseError::MissingMigration {
                    package: M::PACKAGE.to_string(),
                    version,
                })?;
            let target: &mut dyn Model = &mut working;
            step(target)?;
            working.metadata_mut().schema = version;
        }
        debug!(
            "registry: migrated {} from v{} to v{}",
            std::any::type_name::<M>(),
            found,
            current
        );
        *model = working;
        Ok(current)
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (package, steps) in &self.packages {
            let versions: Vec<(u32, Vec<&str>)> = steps
                .iter()
                .map(|(v, regs)| (*v, regs.iter().map(|r| r.type_name).collect()))
                .collect();
            map.entry(package, &versions);
        }
        map.finish()
    }
}
