//! Declarative, revision-tracked schema migrations.
//!
//! Storage code describes each table as an ordered script of
//! [`MigrationElement`]s. On startup the script is reconciled with the revision
//! recorded in the database: missing tables are created at their newest
//! revision, existing ones are stepped forward one transaction per revision.
//!
//! # Features
//!
//! - **`sqlite`** (default) - SQLite support
//! - **`mysql`** - MySQL support
//! - **`postgres`** - PostgreSQL support
//!
//! # Example
//!
//! ```rust,ignore
//! use tablerev::{Column, ColumnType, DefaultValue, MigrationElement::*};
//!
//! static MIGRATIONS: &[tablerev::MigrationElement] = &[
//!     Table("maptiles"),
//!     AddColumn(Column::new("LocX", ColumnType::UInt).not_null()),
//!     AddColumn(Column::new("LocY", ColumnType::UInt).not_null()),
//!     AddColumn(Column::new("ScopeID", ColumnType::Uuid).not_null().with_default(DefaultValue::ZERO_UUID)),
//!     AddColumn(Column::new("Data", ColumnType::Bytes).long()),
//!     PrimaryKey(&["LocX", "LocY", "ScopeID"]),
//!     Revision(2),
//!     PrimaryKey(&["LocX", "LocY"]),
//!     DropColumn("ScopeID"),
//! ];
//!
//! tablerev::migrate_tables(&pool, MIGRATIONS).await?;
//! ```

pub use tablerev_core::*;
pub use tablerev_sql::*;
