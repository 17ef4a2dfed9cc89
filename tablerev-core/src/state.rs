//! Accumulated schema of one table.

use crate::{
    column::Column,
    element::{ChangeColumn, MigrationElement, NamedKey},
    error::DefinitionError,
};

const PRIMARY_KEY: &str = "primary key";

/// A secondary index as it stands after folding.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyState {
    pub name: &'static str,
    pub fields: Vec<&'static str>,
    pub unique: bool,
}

/// Schema of a table obtained by folding its elements in order.
///
/// Columns and named keys keep their declaration order so the statements
/// generated from a state are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    name: &'static str,
    columns: Vec<Column>,
    primary_key: Option<Vec<&'static str>>,
    named_keys: Vec<KeyState>,
}

impl TableState {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: None,
            named_keys: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&[&'static str]> {
        self.primary_key.as_deref()
    }

    pub fn named_keys(&self) -> &[KeyState] {
        &self.named_keys
    }

    pub fn named_key(&self, name: &str) -> Option<&KeyState> {
        self.named_keys.iter().find(|k| k.name == name)
    }

    /// Physical columns covered by a list of declared fields.
    pub fn physical_key_columns(&self, fields: &[&'static str]) -> Vec<String> {
        fields
            .iter()
            .flat_map(|field| match self.column(field) {
                Some(column) => column.physical_names(),
                None => vec![field.to_string()],
            })
            .collect()
    }

    /// Folds one element into the state.
    ///
    /// `Table` and `Revision` delimit groups and leave the state untouched.
    pub fn apply(mut self, element: &MigrationElement) -> Result<Self, DefinitionError> {
        match element {
            MigrationElement::Table(_) | MigrationElement::Revision(_) => {}
            MigrationElement::AddColumn(column) => self.add_column(column)?,
            MigrationElement::ChangeColumn(change) => self.change_column(change)?,
            MigrationElement::DropColumn(name) => self.drop_column(*name)?,
            MigrationElement::PrimaryKey(fields) => {
                self.check_key(PRIMARY_KEY, fields)?;
                self.primary_key = Some(fields.to_vec());
            }
            MigrationElement::DropPrimaryKey => self.primary_key = None,
            MigrationElement::NamedKey(key) => self.add_named_key(key)?,
            MigrationElement::DropNamedKey(name) => {
                let Some(index) = self.named_keys.iter().position(|k| k.name == *name) else {
                    return Err(DefinitionError::UnknownNamedKey {
                        table: self.name,
                        key: *name,
                    });
                };
                self.named_keys.remove(index);
            }
        }

        Ok(self)
    }

    fn add_column(&mut self, column: &Column) -> Result<(), DefinitionError> {
        if self.column(column.name).is_some() || self.clashes(column, None) {
            return Err(DefinitionError::DuplicateColumn {
                table: self.name,
                column: column.name,
            });
        }

        self.check_default(column)?;
        self.columns.push(*column);

        Ok(())
    }

    fn change_column(&mut self, change: &ChangeColumn) -> Result<(), DefinitionError> {
        let source = change.source();
        let new_name = change.column.name;

        let Some(index) = self.columns.iter().position(|c| c.name == source) else {
            return Err(DefinitionError::UnknownColumn {
                table: self.name,
                kind: "change column",
                column: source,
            });
        };

        if (source != new_name && self.column(new_name).is_some())
            || self.clashes(&change.column, Some(index))
        {
            return Err(DefinitionError::DuplicateColumn {
                table: self.name,
                column: new_name,
            });
        }

        self.check_default(&change.column)?;
        self.columns[index] = change.column;

        if source != new_name {
            let keys = self
                .primary_key
                .iter_mut()
                .chain(self.named_keys.iter_mut().map(|k| &mut k.fields));

            for fields in keys {
                for field in fields.iter_mut().filter(|f| **f == source) {
                    *field = new_name;
                }
            }
        }

        Ok(())
    }

    /// Whether a physical column of `column` is already stored under the same
    /// name, ignoring ASCII case, by any column other than the one at `replacing`.
    fn clashes(&self, column: &Column, replacing: Option<usize>) -> bool {
        let names = column.physical_names();

        self.columns
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != replacing)
            .flat_map(|(_, existing)| existing.physical_names())
            .any(|existing| names.iter().any(|name| name.eq_ignore_ascii_case(&existing)))
    }

    fn drop_column(&mut self, name: &'static str) -> Result<(), DefinitionError> {
        let Some(index) = self.columns.iter().position(|c| c.name == name) else {
            return Err(DefinitionError::UnknownColumn {
                table: self.name,
                kind: "drop column",
                column: name,
            });
        };

        if self
            .primary_key
            .as_ref()
            .is_some_and(|fields| fields.contains(&name))
        {
            return Err(DefinitionError::ColumnInUse {
                table: self.name,
                column: name,
                key: PRIMARY_KEY,
            });
        }

        if let Some(key) = self.named_keys.iter().find(|k| k.fields.contains(&name)) {
            return Err(DefinitionError::ColumnInUse {
                table: self.name,
                column: name,
                key: key.name,
            });
        }

        self.columns.remove(index);

        Ok(())
    }

    fn add_named_key(&mut self, key: &NamedKey) -> Result<(), DefinitionError> {
        if self.named_key(key.name).is_some() {
            return Err(DefinitionError::DuplicateNamedKey {
                table: self.name,
                key: key.name,
            });
        }

        self.check_key(key.name, key.fields)?;
        self.named_keys.push(KeyState {
            name: key.name,
            fields: key.fields.to_vec(),
            unique: key.unique,
        });

        Ok(())
    }

    fn check_key(&self, key: &'static str, fields: &[&'static str]) -> Result<(), DefinitionError> {
        if fields.is_empty() {
            return Err(DefinitionError::EmptyKey {
                table: self.name,
                key,
            });
        }

        if let Some(column) = fields.iter().find(|f| self.column(f).is_none()) {
            return Err(DefinitionError::UnknownKeyColumn {
                table: self.name,
                key,
                column: *column,
            });
        }

        Ok(())
    }

    fn check_default(&self, column: &Column) -> Result<(), DefinitionError> {
        if column.default_matches_type() {
            return Ok(());
        }

        Err(DefinitionError::DefaultMismatch {
            table: self.name,
            column: column.name,
        })
    }
}
