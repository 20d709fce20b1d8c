//! Error types for the store module.

use owid_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error from the file backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A signer already exists for the domain.
    #[error("signer for domain '{0}' already registered")]
    DuplicateSigner(String),

    /// No signer exists for the domain.
    #[error("no signer registered for domain '{0}'")]
    UnknownSigner(String),

    /// Stored data could not be interpreted.
    #[error("invalid data in storage: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Error raised by the OWID core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
