//! Error types for berean-core

use thiserror::Error;

/// Result type alias using berean-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in berean-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness constraint violation
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map a `SQLite` failure to [`Error::Constraint`] when it is a uniqueness
    /// violation, otherwise wrap it as a database error.
    pub(crate) fn from_sqlite(err: rusqlite::Error, what: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(cause, _)
                if cause.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(what.to_string())
            }
            _ => Self::Database(err),
        }
    }
}
