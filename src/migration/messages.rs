//! Protobuf messages of the migration package.
//!
//! Field numbers are part of the on-chain format and must not change.

use prost::Message;

use crate::error::{NetabaseError, NetabaseResult};
use crate::orm::validate_name;
use crate::traits::migration::Migratable;
use crate::traits::model::Model;

/// Package name under which the migration models and configuration live.
pub const MIGRATION_PACKAGE: &str = "migration";

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Schema version stamp embedded in versioned models.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct Metadata {
    #[prost(uint32, tag = "1")]
    pub schema: u32,
}

impl Metadata {
    pub fn new(schema: u32) -> Self {
        Self { schema }
    }

    pub fn validate(&self) -> NetabaseResult<()> {
        if self.schema < 1 {
            return Err(NetabaseError::Input("schema version must be at least 1".into()));
        }
        Ok(())
    }
}

/// Validate an optional metadata field, which is required.
pub fn validate_metadata(metadata: Option<&Metadata>) -> NetabaseResult<()> {
    metadata
        .ok_or_else(|| NetabaseError::Input("metadata is required".into()))?
        .validate()
}

pub fn validate_address(address: &[u8]) -> NetabaseResult<()> {
    if address.len() != ADDRESS_LEN {
        return Err(NetabaseError::Input(format!(
            "address must be {ADDRESS_LEN} bytes, got {}",
            address.len()
        )));
    }
    Ok(())
}

fn validate_package(pkg: &str) -> NetabaseResult<()> {
    validate_name(pkg).map_err(|_| NetabaseError::Input(format!("invalid package name {pkg:?}")))
}

/// Migration package configuration.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Configuration {
    /// Address allowed to upgrade schema versions.
    #[prost(bytes = "vec", tag = "2")]
    pub admin: Vec<u8>,
}

/// Highest schema version the chain accepts for one package.
///
/// One row is stored per accepted version; the current version is the
/// highest row of the package.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Schema {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<Metadata>,
    #[prost(string, tag = "2")]
    pub pkg: String,
    #[prost(uint32, tag = "3")]
    pub version: u32,
}

impl Schema {
    pub fn new(pkg: &str, version: u32) -> Self {
        Self {
            metadata: Some(Metadata::new(1)),
            pkg: pkg.to_string(),
            version,
        }
    }
}

/// Request to move one package's schema forward by exactly one version.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct UpgradeSchemaMsg {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<Metadata>,
    #[prost(string, tag = "2")]
    pub pkg: String,
    /// Must be one above the current version, or 1 for a package that has
    /// no schema yet.
    #[prost(uint32, tag = "3")]
    pub to_version: u32,
}

impl UpgradeSchemaMsg {
    pub fn new(pkg: &str, to_version: u32) -> Self {
        Self {
            metadata: Some(Metadata::new(1)),
            pkg: pkg.to_string(),
            to_version,
        }
    }
}

fn decode_into<T: Message + Default>(target: &mut T, bytes: &[u8]) -> NetabaseResult<()> {
    *target = T::decode(bytes)?;
    Ok(())
}

impl Model for Metadata {
    fn marshal(&self) -> NetabaseResult<Vec<u8>> {
        Ok(self.encode_to_vec())
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
        decode_into(self, bytes)
    }

    fn validate(&self) -> NetabaseResult<()> {
        Metadata::validate(self)
    }
}

impl Model for Configuration {
    fn marshal(&self) -> NetabaseResult<Vec<u8>> {
        Ok(self.encode_to_vec())
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
        decode_into(self, bytes)
    }

    fn validate(&self) -> NetabaseResult<()> {
        validate_address(&self.admin)
    }
}

impl Model for Schema {
    fn marshal(&self) -> NetabaseResult<Vec<u8>> {
        Ok(self.encode_to_vec())
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
        decode_into(self, bytes)
    }

    fn validate(&self) -> NetabaseResult<()> {
        validate_metadata(self.metadata.as_ref())?;
        validate_package(&self.pkg)?;
        if self.version < 1 {
            return Err(NetabaseError::Input("version must be at least 1".into()));
        }
        Ok(())
    }
}

impl Migratable for Schema {
    const PACKAGE: &'static str = MIGRATION_PACKAGE;

    fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::default)
    }
}

impl Model for UpgradeSchemaMsg {
    fn marshal(&self) -> NetabaseResult<Vec<u8>> {
        Ok(self.encode_to_vec())
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
        decode_into(self, bytes)
    }

    fn validate(&self) -> NetabaseResult<()> {
        validate_metadata(self.metadata.as_ref())?;
        validate_package(&self.pkg)?;
        if self.to_version < 1 {
            return Err(NetabaseError::Input("to_version must be at least 1".into()));
        }
        Ok(())
    }
}
