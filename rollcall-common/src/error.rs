//! Common error types for Rollcall

use thiserror::Error;

/// Common result type for Rollcall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the store, configuration and validation layers
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested class or student not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Date string is not `YYYY-MM-DD` or falls outside the permitted window
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Image reference is not a usable `data:image/...;base64,` URI
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when SQLite reported transient lock contention.
    ///
    /// Only these errors are worth retrying; everything else fails fast.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }

    /// True for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidDate(_) | Error::InvalidImage(_) | Error::InvalidInput(_)
        )
    }
}
