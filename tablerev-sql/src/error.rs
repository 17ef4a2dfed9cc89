//! Error types for migration runs.

use tablerev_core::DefinitionError;
use thiserror::Error;

/// Errors returned by [`Migrator::run`](crate::Migrator::run).
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The script is structurally invalid; nothing was executed.
    #[error("invalid migration script: {0}")]
    Definition(#[from] DefinitionError),

    /// A statement of a revision step failed and its transaction was rolled back.
    #[error("table '{table}' revision {revision}: statement failed: {source}")]
    Execution {
        table: &'static str,
        revision: u32,
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    /// Opening or committing a step transaction failed.
    #[error("table '{table}': transaction failed: {source}")]
    Transaction {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The revision store could not be created or read.
    #[error("revision store: {0}")]
    RevisionStore(#[source] sqlx::Error),

    /// The revision store holds a value no revision can have.
    #[error("table '{table}': invalid stored revision {value}")]
    InvalidRevisionRecord { table: &'static str, value: i64 },

    /// The copy statement of a table rebuild could not be built.
    #[error("table rebuild: {0}")]
    Rebuild(#[from] sea_query::error::Error),

    #[error("'{0}' not supported, consider using SQLite, PostgreSQL or MySQL")]
    UnsupportedDatabase(String),

    /// No connection could be acquired from the pool.
    #[error("connection: {0}")]
    Connection(#[source] sqlx::Error),
}

impl MigrationError {
    /// True for mistakes in the script itself, as opposed to database failures.
    pub fn is_definition(&self) -> bool {
        matches!(self, MigrationError::Definition(_))
    }

    /// Text of the statement that failed, if any.
    pub fn statement(&self) -> Option<&str> {
        match self {
            MigrationError::Execution { statement, .. } => Some(statement),
            _ => None,
        }
    }
}
