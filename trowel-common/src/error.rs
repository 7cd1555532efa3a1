//! Common error types for trowel

use thiserror::Error;

/// Common result type for trowel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure errors shared by the trowel crates
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

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite busy/locked errors that clear up on their own
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(db_err) => is_lock_contention(db_err),
            _ => false,
        }
    }
}

/// True if a sqlx error is SQLite reporting a busy or locked database
pub fn is_lock_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            message.contains("database is locked") || message.contains("database is busy")
        }
        _ => false,
    }
}
