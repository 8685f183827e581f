//! Error types for Netabase ORM operations.
//!
//! All public APIs return [`NetabaseResult<T>`], an alias for
//! `Result<T, NetabaseError>`. Nothing in this crate retries or recovers
//! locally: every error is handed back to the caller, which decides whether a
//! failure rejects the transaction or aborts the block.
//!
//! # Classifying errors
//!
//! ```
//! use netabase_orm::error::{ErrorKind, NetabaseError};
//!
//! let err = NetabaseError::NotFound("cnt:\x01".to_string());
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert!(err.is_not_found());
//! assert_eq!(err.kind().as_ref(), "NotFound");
//! ```

use strum::{AsRefStr, Display, EnumIter};
use thiserror::Error;

/// Result type alias for Netabase ORM operations.
pub type NetabaseResult<T> = Result<T, NetabaseError>;

/// The main error type for bucket, index and migration operations.
#[derive(Error, Debug)]
pub enum NetabaseError {
    /// No entry exists under the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value or a destination does not match the bucket's model type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The requested index is not registered on the bucket.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// The model refused to validate. The source is the model's own reason.
    #[error("invalid model: {source}")]
    ValidationFailed {
        #[source]
        source: Box<NetabaseError>,
    },

    /// Invalid input reported by a model's `validate` implementation.
    #[error("invalid input: {0}")]
    Input(String),

    /// A unique index already maps the derived key to another primary key.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// The iterator reached the end of its range.
    #[error("iterator done")]
    IteratorExhausted,

    /// The stored schema version is newer than the running code accepts.
    #[error("schema too new: {package} data is at v{found}, supported up to v{supported}")]
    SchemaTooNew {
        package: String,
        found: u32,
        supported: u32,
    },

    /// A schema upgrade request was rejected.
    #[error("invalid upgrade: {0}")]
    InvalidUpgrade(String),

    /// A migration step required to reach the current schema is not registered.
    #[error("no migration registered for {package} v{version}")]
    MissingMigration { package: String, version: u32 },

    /// The migration registry could not be built.
    #[error("migration registration: {0}")]
    Registration(String),

    /// A key or a name cannot be used with this bucket.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Wraps errors from the sled database
    #[cfg(feature = "sled")]
    #[error(transparent)]
    SledError(#[from] sled::Error),

    /// Wraps serialization errors from bincode
    #[error(transparent)]
    EncodeError(#[from] bincode::error::EncodeError),

    /// Wraps deserialization errors from bincode
    #[error(transparent)]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Wraps protobuf serialization errors
    #[error(transparent)]
    ProtoEncodeError(#[from] prost::EncodeError),

    /// Wraps protobuf deserialization errors
    #[error(transparent)]
    ProtoDecodeError(#[from] prost::DecodeError),

    /// Custom error with a message
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`NetabaseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum ErrorKind {
    NotFound,
    TypeMismatch,
    InvalidIndex,
    ValidationFailed,
    Input,
    Duplicate,
    IteratorExhausted,
    SchemaTooNew,
    InvalidUpgrade,
    MissingMigration,
    Registration,
    InvalidKey,
    Backend,
    Encoding,
    Other,
}

impl NetabaseError {
    /// Wrap a model validation failure.
    pub fn validation(source: NetabaseError) -> Self {
        NetabaseError::ValidationFailed {
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetabaseError::NotFound(_) => ErrorKind::NotFound,
            NetabaseError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            NetabaseError::InvalidIndex(_) => ErrorKind::InvalidIndex,
            NetabaseError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            NetabaseError::Input(_) => ErrorKind::Input,
            NetabaseError::Duplicate(_) => ErrorKind::Duplicate,
            NetabaseError::IteratorExhausted => ErrorKind::IteratorExhausted,
            NetabaseError::SchemaTooNew { .. } => ErrorKind::SchemaTooNew,
            NetabaseError::InvalidUpgrade(_) => ErrorKind::InvalidUpgrade,
            NetabaseError::MissingMigration { .. } => ErrorKind::MissingMigration,
            NetabaseError::Registration(_) => ErrorKind::Registration,
            NetabaseError::InvalidKey(_) => ErrorKind::InvalidKey,
            #[cfg(feature = "sled")]
            NetabaseError::SledError(_) => ErrorKind::Backend,
            NetabaseError::EncodeError(_)
            | NetabaseError::DecodeError(_)
            | NetabaseError::ProtoEncodeError(_)
            | NetabaseError::ProtoDecodeError(_) => ErrorKind::Encoding,
            NetabaseError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }

    pub fn is_iterator_exhausted(&self) -> bool {
        self.kind() == ErrorKind::IteratorExhausted
    }
}
