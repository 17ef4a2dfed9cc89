//! Structural errors in migration scripts.

use thiserror::Error;

/// A migration script that cannot be applied as written.
///
/// These are authoring mistakes: they are detected while the script is folded,
/// before any statement reaches the database, and are never worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("migration script is empty")]
    EmptyScript,

    #[error("first entry must be a table declaration, got {0}")]
    MissingTableDeclaration(&'static str),

    #[error("table '{0}' is declared twice")]
    DuplicateTable(&'static str),

    #[error("table name '{0}' is reserved for the revision store")]
    ReservedTable(&'static str),

    #[error("table '{table}': invalid revision entry, expected {expected}, got {actual}")]
    InvalidRevision {
        table: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("table '{table}': column '{column}' was added twice")]
    DuplicateColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("table '{table}': {kind} of '{column}' has no preceding add column")]
    UnknownColumn {
        table: &'static str,
        kind: &'static str,
        column: &'static str,
    },

    #[error("table '{table}': column '{column}' is still used by key '{key}'")]
    ColumnInUse {
        table: &'static str,
        column: &'static str,
        key: &'static str,
    },

    #[error("table '{table}': default of column '{column}' does not match its type")]
    DefaultMismatch {
        table: &'static str,
        column: &'static str,
    },

    #[error("table '{table}': key '{key}' has no fields")]
    EmptyKey {
        table: &'static str,
        key: &'static str,
    },

    #[error("table '{table}': key '{key}' references unknown column '{column}'")]
    UnknownKeyColumn {
        table: &'static str,
        key: &'static str,
        column: &'static str,
    },

    #[error("table '{table}': named key '{key}' was added twice")]
    DuplicateNamedKey {
        table: &'static str,
        key: &'static str,
    },

    #[error("table '{table}': named key '{key}' does not exist")]
    UnknownNamedKey {
        table: &'static str,
        key: &'static str,
    },

    #[error("table '{table}' has no columns at revision {revision}")]
    NoColumns { table: &'static str, revision: u32 },
}
