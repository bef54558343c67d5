//! Error types for warehouse database operations.
//!
//! Provides a unified error type covering database access, migrations,
//! identifier quoting, and row-level consistency failures.

use thiserror::Error;

/// Errors that can occur during warehouse database operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// An identifier cannot be quoted (it contains a NUL byte).
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// The database was written by a newer schema than this build knows.
    #[error(
        "database schema version {found} is newer than the {known} migration steps known to this build"
    )]
    SchemaTooNew { found: usize, known: usize },

    /// A migration step or purge failed.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// A destructive operation was attempted inside an open transaction.
    #[error("refusing to run inside an open transaction")]
    InTransaction,

    /// A feed item lacks a field a column map reads.
    #[error("feed item has no field '{0}'")]
    MissingField(String),

    /// A check procedure did not match exactly one row.
    #[error("check on '{table}' matched {matched} rows, expected exactly 1; bindings: {bindings}")]
    CheckFailed {
        table: String,
        matched: usize,
        bindings: String,
    },
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
