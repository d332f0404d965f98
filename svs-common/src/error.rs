//! Common error types for SVS

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for SVS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the SVS crates
///
/// A lookup miss is not represented here: `NOT_FOUND` is a classification
/// outcome, not a failure.
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

    /// Input does not fit the fixed identifier width
    #[error("Malformed input: {significant} significant characters exceed width {width}")]
    MalformedInput { significant: usize, width: usize },

    /// Required sheet or column missing; aborts the whole import
    #[error("Structural import error in sheet '{sheet}': missing {}", .missing.join(", "))]
    StructuralImport { sheet: String, missing: Vec<String> },

    /// Import source could not be read
    #[error("Import source {} unreadable: {reason}", .path.display())]
    Source { path: PathBuf, reason: String },

    /// Persistence layer failed while publishing or reading a table
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Another import currently holds the import slot
    #[error("An import is already in progress")]
    ImportInProgress,

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite "database is locked" contention
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(db_err) => db_err.to_string().contains("database is locked"),
            _ => false,
        }
    }
}
