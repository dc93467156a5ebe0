//! Error types for selah-core

use thiserror::Error;

/// Result type alias using selah-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in selah-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Insert targeted an identity that already exists
    #[error("Entry already exists: {0}")]
    ConstraintViolation(String),

    /// Operation referenced a nonexistent entry
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The merge policy could not determine a winner
    #[error("Conflict resolution failed: {0}")]
    ConflictResolutionFailed(String),

    /// Legacy migration transaction failed
    #[error("Legacy migration failed: {0}")]
    MigrationFailed(String),

    /// Persistence context unreachable during migration
    #[error("Store unavailable: {0}")]
    ContextNotAvailable(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
