//! Common error types for MissingBrick

use thiserror::Error;

/// Common result type for MissingBrick operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by stores, services and the HTTP layer
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource already exists (e.g. duplicate set number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Catalog call failed, returned non-success, or could not be decoded
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map a unique-index violation to `Conflict`, leaving other database errors alone
    pub fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Conflict(format!("{} already exists", what.into()))
            }
            _ => Error::Database(err),
        }
    }
}
