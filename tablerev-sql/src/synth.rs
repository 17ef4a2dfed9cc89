//! Translation of table states and revision steps into DDL.
//!
//! Both table creation and incremental steps build columns and keys through
//! [`column_def`] and [`index_statement`], so a table created at revision `n` and
//! a table migrated to revision `n` end up with the same schema.

use sea_query::{
    Alias, ColumnDef, Index, IndexCreateStatement, Query, Table, TableAlterStatement,
    TableCreateStatement, Value,
};
use tablerev_core::{
    Column, KeyState, MigrationElement, PhysicalColumn, PhysicalDefault, RevisionStep, Scalar,
    TableState,
};

use crate::{Dialect, MigrationError};

/// Suffix of the scratch table used while a table is rebuilt.
pub const REBUILD_SUFFIX: &str = "__rebuild";

pub fn index_name(table: &str, key: &str) -> String {
    format!("{table}_{key}")
}

pub fn primary_key_name(table: &str) -> String {
    format!("{table}_pk")
}

fn ident(name: impl Into<String>) -> Alias {
    Alias::new(name.into())
}

/// `CREATE TABLE` for `state` followed by its named keys.
pub fn create_table(dialect: Dialect, state: &TableState) -> Vec<String> {
    let mut statements = vec![dialect.schema(&table_statement(
        dialect,
        state.name(),
        state,
        &primary_key_name(state.name()),
    ))];

    statements.extend(
        state
            .named_keys()
            .iter()
            .map(|key| dialect.schema(&index_statement(state, key))),
    );

    statements
}

pub fn drop_table(dialect: Dialect, table: &str) -> String {
    dialect.schema(&Table::drop().table(ident(table)).if_exists().to_owned())
}

/// Statements moving a table from `before` to `step.state`.
pub fn apply_step(
    dialect: Dialect,
    before: &TableState,
    step: &RevisionStep,
) -> Result<Vec<String>, MigrationError> {
    if needs_rebuild(dialect, before, step)? {
        return rebuild(dialect, before, step);
    }

    let table = before.name();
    let mut state = before.clone();
    let mut statements = Vec::new();

    for element in &step.elements {
        match element {
            MigrationElement::AddColumn(column) => {
                for physical in column.physical() {
                    let mut statement = alter(table);
                    statement.add_column(&mut column_def(dialect, column, &physical));
                    statements.push(dialect.schema(&statement));
                }
            }
            MigrationElement::ChangeColumn(change) => {
                if let Some(old) = state.column(change.source()) {
                    change_column(dialect, table, old, &change.column, &mut statements);
                }
            }
            MigrationElement::DropColumn(name) => {
                if let Some(column) = state.column(name) {
                    for physical in column.physical_names() {
                        let mut statement = alter(table);
                        statement.drop_column(ident(physical));
                        statements.push(dialect.schema(&statement));
                    }
                }
            }
            MigrationElement::NamedKey(key) => {
                let key = KeyState {
                    name: key.name,
                    fields: key.fields.to_vec(),
                    unique: key.unique,
                };
                statements.push(dialect.schema(&index_statement(&state, &key)));
            }
            MigrationElement::DropNamedKey(name) => {
                let statement = Index::drop()
                    .name(index_name(table, name))
                    .table(ident(table))
                    .to_owned();
                statements.push(dialect.schema(&statement));
            }
            MigrationElement::Table(_)
            | MigrationElement::Revision(_)
            | MigrationElement::PrimaryKey(_)
            | MigrationElement::DropPrimaryKey => {}
        }

        state = state.apply(element)?;
    }

    Ok(statements)
}

fn alter(table: &str) -> TableAlterStatement {
    Table::alter().table(ident(table)).to_owned()
}

fn change_column(
    dialect: Dialect,
    table: &str,
    old: &Column,
    new: &Column,
    statements: &mut Vec<String>,
) {
    let old_physical = old.physical();
    let new_physical = new.physical();
    let modified = !old.same_storage(new);

    for physical in &old_physical {
        if new_physical.iter().all(|p| p.suffix != physical.suffix) {
            let mut statement = alter(table);
            statement.drop_column(ident(physical.name.as_str()));
            statements.push(dialect.schema(&statement));
        }
    }

    for physical in &new_physical {
        let Some(current) = old_physical.iter().find(|p| p.suffix == physical.suffix) else {
            let mut statement = alter(table);
            statement.add_column(&mut column_def(dialect, new, physical));
            statements.push(dialect.schema(&statement));
            continue;
        };

        if current.name != physical.name {
            let mut statement = alter(table);
            statement.rename_column(
                ident(current.name.as_str()),
                ident(physical.name.as_str()),
            );
            statements.push(dialect.schema(&statement));
        }

        if modified {
            let mut statement = alter(table);
            statement.modify_column(&mut column_def(dialect, new, physical));
            statements.push(dialect.schema(&statement));

            if dialect.keeps_default_on_modify()
                && current.default.is_some()
                && physical.default.is_none()
            {
                statements.push(drop_default(dialect, table, &physical.name));
            }
        }
    }
}

fn drop_default(dialect: Dialect, table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
        dialect.quote(table),
        dialect.quote(column)
    )
}

/// Whether the step contains something `ALTER TABLE` cannot express.
fn needs_rebuild(
    dialect: Dialect,
    before: &TableState,
    step: &RevisionStep,
) -> Result<bool, MigrationError> {
    let mut state = before.clone();

    for element in &step.elements {
        let rebuild = match element {
            MigrationElement::PrimaryKey(_) | MigrationElement::DropPrimaryKey => true,
            MigrationElement::ChangeColumn(change) => {
                !dialect.alters_columns()
                    && state
                        .column(change.source())
                        .is_some_and(|old| !old.same_storage(&change.column))
            }
            MigrationElement::AddColumn(column) => {
                !dialect.adds_required_columns() && !column.nullable && column.default.is_none()
            }
            _ => false,
        };

        if rebuild {
            return Ok(true);
        }

        state = state.apply(element)?;
    }

    Ok(false)
}

/// Recreates the table at `step.state` and copies the surviving rows.
fn rebuild(
    dialect: Dialect,
    before: &TableState,
    step: &RevisionStep,
) -> Result<Vec<String>, MigrationError> {
    let table = before.name();
    let scratch = format!("{table}{REBUILD_SUFFIX}");
    let key_name = primary_key_name(table);

    // Postgres still holds the old table's constraint name while the scratch
    // table exists.
    let scratch_key_name = if dialect.has_schema_constraint_names() {
        primary_key_name(&scratch)
    } else {
        key_name.clone()
    };

    let mut statements = vec![dialect.schema(&table_statement(
        dialect,
        &scratch,
        &step.state,
        &scratch_key_name,
    ))];

    let (targets, sources) = copied_columns(before, step);

    if !targets.is_empty() {
        let select = Query::select()
            .columns(sources.into_iter().map(ident))
            .from(ident(table))
            .to_owned();

        let mut insert = Query::insert();
        insert
            .into_table(ident(scratch.as_str()))
            .columns(targets.into_iter().map(ident))
            .select_from(select)?;

        statements.push(dialect.inline(&insert));
    }

    statements.push(dialect.schema(&Table::drop().table(ident(table)).to_owned()));
    statements.push(dialect.schema(
        &Table::rename()
            .table(ident(scratch.as_str()), ident(table))
            .to_owned(),
    ));

    if scratch_key_name != key_name && step.state.primary_key().is_some() {
        statements.push(format!(
            "ALTER TABLE {} RENAME CONSTRAINT {} TO {}",
            dialect.quote(table),
            dialect.quote(&scratch_key_name),
            dialect.quote(&key_name)
        ));
    }

    statements.extend(
        step.state
            .named_keys()
            .iter()
            .map(|key| dialect.schema(&index_statement(&step.state, key))),
    );

    Ok(statements)
}

/// Physical columns of the new state paired with the old columns they are copied from.
fn copied_columns(before: &TableState, step: &RevisionStep) -> (Vec<String>, Vec<String>) {
    // current name, name before the step
    let mut origins: Vec<(&'static str, Option<&'static str>)> =
        before.columns().iter().map(|c| (c.name, Some(c.name))).collect();

    for element in &step.elements {
        match element {
            MigrationElement::AddColumn(column) => origins.push((column.name, None)),
            MigrationElement::ChangeColumn(change) => {
                let source = change.source();
                if let Some(origin) = origins.iter_mut().find(|(name, _)| *name == source) {
                    origin.0 = change.column.name;
                }
            }
            MigrationElement::DropColumn(name) => origins.retain(|(current, _)| current != name),
            _ => {}
        }
    }

    let mut targets = Vec::new();
    let mut sources = Vec::new();

    for column in step.state.columns() {
        let old = origins
            .iter()
            .find(|(name, _)| *name == column.name)
            .and_then(|(_, origin)| *origin)
            .and_then(|origin| before.column(origin));

        let Some(old) = old else {
            continue;
        };

        let old_physical = old.physical();

        for physical in column.physical() {
            if let Some(source) = old_physical.iter().find(|p| p.suffix == physical.suffix) {
                targets.push(physical.name);
                sources.push(source.name.clone());
            }
        }
    }

    (targets, sources)
}

fn table_statement(
    dialect: Dialect,
    name: &str,
    state: &TableState,
    key_name: &str,
) -> TableCreateStatement {
    let mut statement = Table::create();
    statement.table(ident(name));

    for column in state.columns() {
        for physical in column.physical() {
            statement.col(&mut column_def(dialect, column, &physical));
        }
    }

    if let Some(fields) = state.primary_key() {
        let mut key = Index::create();
        key.name(key_name);

        for column in state.physical_key_columns(fields) {
            key.col(ident(column));
        }

        statement.primary_key(&mut key);
    }

    statement
}

fn index_statement(state: &TableState, key: &KeyState) -> IndexCreateStatement {
    let mut statement = Index::create();
    statement
        .name(index_name(state.name(), key.name))
        .table(ident(state.name()));

    for column in state.physical_key_columns(&key.fields) {
        statement.col(ident(column));
    }

    if key.unique {
        statement.unique();
    }

    statement
}

fn column_def(dialect: Dialect, column: &Column, physical: &PhysicalColumn) -> ColumnDef {
    let mut def = ColumnDef::new(ident(physical.name.as_str()));

    match physical.scalar {
        Scalar::Bool | Scalar::Integer => def.integer(),
        Scalar::Unsigned => def.unsigned(),
        Scalar::BigInteger => def.big_integer(),
        Scalar::BigUnsigned => def.big_unsigned(),
        Scalar::Float => def.float(),
        Scalar::Double => def.double(),
        Scalar::Uuid => def.string().char_len(36),
        Scalar::Text => match column.cardinality {
            Some(len) if column.fixed => def.string().char_len(len),
            Some(len) => def.string().string_len(len),
            None if column.long && dialect.has_long_types() => def.custom(ident("longtext")),
            None => def.text(),
        },
        Scalar::Bytes => match column.cardinality {
            Some(len) if column.fixed => def.binary_len(len),
            Some(len) => def.var_binary(len),
            None if column.long && dialect.has_long_types() => def.custom(ident("longblob")),
            None => def.blob(),
        },
    };

    if column.nullable {
        def.null();
    } else {
        def.not_null();
    }

    if let Some(default) = physical.default {
        def.default(default_value(default));
    }

    def
}

fn default_value(default: PhysicalDefault) -> Value {
    match default {
        PhysicalDefault::Int(v) => v.into(),
        PhysicalDefault::UInt(v) => v.into(),
        PhysicalDefault::Double(v) => v.into(),
        PhysicalDefault::Text(v) => v.into(),
    }
}


#[cfg(all(test, feature = "postgres"))]
mod postgres_tests {
    use super::apply_step;
    use crate::Dialect;
    use tablerev_core::{
        ChangeColumn as Change, Column, ColumnType, DefaultValue, MigrationElement::*, Script,
    };

    #[test]
    fn type_change_drops_stale_default() -> anyhow::Result<()> {
        let script = Script::parse(&[
            Table("t"),
            AddColumn(
                Column::new("a", ColumnType::Int)
                    .not_null()
                    .with_default(DefaultValue::Int(0)),
            ),
            Revision(2),
            ChangeColumn(Change::new(Column::new("a", ColumnType::BigInt))),
        ])?;
        let table = &script.tables()[0];
        let (Some(before), Some(step)) = (table.state_at(1), table.step(2)) else {
            anyhow::bail!("missing revision");
        };

        let statements = apply_step(Dialect::Postgres, before, step)?;

        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("ALTER COLUMN \"a\" TYPE bigint"));
        assert!(!statements[0].contains("DEFAULT"));
        assert_eq!(
            statements[1],
            "ALTER TABLE \"t\" ALTER COLUMN \"a\" DROP DEFAULT"
        );

        Ok(())
    }

    #[test]
    fn rebuild_renames_scratch_constraint() -> anyhow::Result<()> {
        let script = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int).not_null()),
            AddColumn(Column::new("b", ColumnType::Int).not_null()),
            PrimaryKey(&["a"]),
            Revision(2),
            PrimaryKey(&["a", "b"]),
        ])?;
        let table = &script.tables()[0];
        let (Some(before), Some(step)) = (table.state_at(1), table.step(2)) else {
            anyhow::bail!("missing revision");
        };

        let statements = apply_step(Dialect::Postgres, before, step)?;

        assert!(statements[0].contains("CONSTRAINT \"t__rebuild_pk\" PRIMARY KEY"));
        assert_eq!(
            statements.last().map(String::as_str),
            Some("ALTER TABLE \"t\" RENAME CONSTRAINT \"t__rebuild_pk\" TO \"t_pk\"")
        );

        Ok(())
    }
}
