//! Accepted schema versions per package.

use log::debug;

use super::messages::Schema;
use crate::error::{NetabaseError, NetabaseResult};
use crate::orm::{Indexer, ModelBucket};
use crate::traits::store::{KvStore, ReadOnlyKvStore};

pub const SCHEMA_BUCKET: &str = "_schema";
pub const PACKAGE_INDEX: &str = "package";

/// Bucket holding one [`Schema`] row per accepted version of each package.
///
/// Rows are append-only: a package moves forward by saving the row for the
/// next version.
#[derive(Debug, Clone)]
pub struct SchemaBucket {
    bucket: ModelBucket<Schema>,
}

impl SchemaBucket {
    pub fn new() -> NetabaseResult<Self> {
        let bucket = ModelBucket::builder(SCHEMA_BUCKET)
            .with_index(
                PACKAGE_INDEX,
                Indexer::single(|s: &Schema| Ok(Some(s.pkg.clone().into_bytes()))),
                false,
            )
            .build()?;
        Ok(Self { bucket })
    }

    pub fn bucket(&self) -> &ModelBucket<Schema> {
        &self.bucket
    }

    /// Every stored row of `package`, oldest version first.
    pub fn history<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        package: &str,
    ) -> NetabaseResult<Vec<Schema>> {
        let mut rows: Vec<Schema> = Vec::new();
        self.bucket
            .by_index(db, PACKAGE_INDEX, package.as_bytes(), &mut rows)?;
        rows.sort_by_key(|s| s.version);
        Ok(rows)
    }

    /// Highest accepted version of `package`.
    ///
    /// Fails with `NotFound` if the package was never initialised.
    pub fn current_version<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        package: &str,
    ) -> NetabaseResult<u32> {
        self.history(db, package)?
            .last()
            .map(|s| s.version)
            .ok_or_else(|| NetabaseError::NotFound(format!("schema of package {package}")))
    }

    /// Version the next row of `package` must carry.
    pub fn next_version<S: ReadOnlyKvStore + ?Sized>(
        &self,
        db: &S,
        package: &str,
    ) -> NetabaseResult<u32> {
        match self.current_version(db, package) {
            Ok(current) => Ok(current + 1),
            Err(err) if err.is_not_found() => Ok(1),
            Err(err) => Err(err),
        }
    }

    /// Store `schema`, which must be exactly one version ahead of the
    /// package's current one (or version 1 for a new package).
    pub fn save<S: KvStore + ?Sized>(&self, db: &mut S, schema: Schema) -> NetabaseResult<Vec<u8>> {
        let expected = self.next_version(&*db, &schema.pkg)?;
        if schema.version != expected {
            return Err(NetabaseError::InvalidUpgrade(format!(
                "package {} must move to v{expected}, not v{}",
                schema.pkg, schema.version
            )));
        }
        debug!("schema: package {} now at v{}", schema.pkg, schema.version);
        self.bucket.put(db, &[], schema)
    }
}
