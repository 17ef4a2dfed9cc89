//! SQL execution of tablerev migration scripts.
//!
//! This crate applies scripts validated by `tablerev-core` to SQLite, MySQL and
//! PostgreSQL databases through sqlx, rendering every statement with sea-query.
//!
//! # Features
//!
//! - **`sqlite`** (default) - Enables SQLite database support
//! - **`mysql`** - Enables MySQL database support
//! - **`postgres`** - Enables PostgreSQL database support
//!
//! ```toml
//! [dependencies]
//! tablerev-sql = { version = "0.1", default-features = false, features = ["postgres"] }
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tablerev_sql::Migrator;
//!
//! let pool = sqlx::SqlitePool::connect("sqlite:data.db").await?;
//! let report = Migrator::new(MIGRATIONS).name("assets").run(&pool).await?;
//!
//! for table in &report.tables {
//!     println!("{} is at revision {}", table.table, table.outcome.revision());
//! }
//! ```
//!
//! # Revision store
//!
//! Applied revisions live in a `migrations(tablename, revision)` table created on
//! first use. A table missing from it is created directly at its newest
//! revision; an existing table is stepped one revision per transaction.
//!
//! MySQL commits DDL implicitly, so a failing step can leave part of its
//! changes behind there. SQLite and PostgreSQL roll the whole step back.

#[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "postgres")))]
compile_error!("enable at least one of the `sqlite`, `mysql` or `postgres` features");

mod config;
mod dialect;
mod engine;
mod error;
pub mod store;
pub mod synth;

pub use config::*;
pub use dialect::*;
pub use engine::*;
pub use error::*;
