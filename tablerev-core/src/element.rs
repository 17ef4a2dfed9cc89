//! The vocabulary migration scripts are written in.

use crate::column::Column;

/// Declaration of a secondary index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedKey {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub unique: bool,
}

impl NamedKey {
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            name,
            fields,
            unique: false,
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }
}

/// Replacement definition of an existing column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeColumn {
    pub column: Column,
    /// Name the column had before this change, when it is renamed.
    pub old_name: Option<&'static str>,
}

impl ChangeColumn {
    pub const fn new(column: Column) -> Self {
        Self {
            column,
            old_name: None,
        }
    }

    pub const fn renamed_from(self, old_name: &'static str) -> Self {
        Self {
            old_name: Some(old_name),
            ..self
        }
    }

    /// Name of the column this change applies to.
    pub const fn source(&self) -> &'static str {
        match self.old_name {
            Some(name) => name,
            None => self.column.name,
        }
    }
}

/// One step of a migration script.
///
/// A script is a flat, ordered list of elements. Each table starts with
/// [`MigrationElement::Table`]; everything up to the first
/// [`MigrationElement::Revision`] forms revision 1, and the elements after
/// `Revision(n)` form the step from `n - 1` to `n`.
///
/// ```
/// use tablerev_core::{Column, ColumnType, DefaultValue, MigrationElement::*};
///
/// static MIGRATIONS: &[tablerev_core::MigrationElement] = &[
///     Table("t"),
///     AddColumn(Column::new("a", ColumnType::Int).not_null().with_default(DefaultValue::Int(0))),
///     PrimaryKey(&["a"]),
///     Revision(2),
///     AddColumn(Column::new("b", ColumnType::String)),
/// ];
///
/// assert_eq!(MIGRATIONS.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MigrationElement {
    Table(&'static str),
    AddColumn(Column),
    ChangeColumn(ChangeColumn),
    DropColumn(&'static str),
    PrimaryKey(&'static [&'static str]),
    DropPrimaryKey,
    NamedKey(NamedKey),
    DropNamedKey(&'static str),
    Revision(u32),
}

impl MigrationElement {
    /// Short name of the variant, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            MigrationElement::Table(_) => "table",
            MigrationElement::AddColumn(_) => "add column",
            MigrationElement::ChangeColumn(_) => "change column",
            MigrationElement::DropColumn(_) => "drop column",
            MigrationElement::PrimaryKey(_) => "primary key",
            MigrationElement::DropPrimaryKey => "drop primary key",
            MigrationElement::NamedKey(_) => "named key",
            MigrationElement::DropNamedKey(_) => "drop named key",
            MigrationElement::Revision(_) => "revision",
        }
    }
}
