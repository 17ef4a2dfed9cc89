//! Element model and planning for the tablerev migration engine.
//!
//! This crate knows nothing about databases. It defines the vocabulary migration
//! scripts are written in, validates a script as a whole and folds every table
//! into the schema it has at each revision.
//!
//! # Core Concepts
//!
//! ## Scripts
//!
//! A script is a flat `&'static [MigrationElement]`. Each table group starts
//! with [`MigrationElement::Table`] and is split into revisions by
//! [`MigrationElement::Revision`] markers:
//!
//! ```rust
//! use tablerev_core::{Column, ColumnType, DefaultValue, MigrationElement::*, Script};
//!
//! static MIGRATIONS: &[tablerev_core::MigrationElement] = &[
//!     Table("regions"),
//!     AddColumn(Column::new("ID", ColumnType::Uuid).not_null().with_default(DefaultValue::ZERO_UUID)),
//!     AddColumn(Column::new("Location", ColumnType::GridVector)),
//!     PrimaryKey(&["ID"]),
//!     Revision(2),
//!     AddColumn(Column::new("Name", ColumnType::String).cardinality(64)),
//! ];
//!
//! let script = Script::parse(MIGRATIONS).unwrap();
//! assert_eq!(script.max_revision(), 2);
//! ```
//!
//! ## Composite columns
//!
//! Vector, rotation and color types are stored as several physical columns.
//! See [`ColumnType::components`].
//!
//! ## Plans
//!
//! [`TableHistory::plan`] compares the revision stored in the database with
//! the script and returns a [`TablePlan`].

mod column;
mod element;
mod error;
mod script;
mod state;

pub use column::*;
pub use element::*;
pub use error::*;
pub use script::*;
pub use state::*;
