//! The `migrations` table recording the applied revision of every table.

use sea_query::{ColumnDef, Expr, ExprTrait, Iden, OnConflict, Query, Table};
use sqlx::Database;

use crate::{Dialect, MigrationError};

/// Column identifiers for the `migrations` table.
#[derive(Iden, Clone)]
pub enum Migrations {
    /// The table name: `migrations`
    Table,
    /// Name of the migrated table (primary key)
    Tablename,
    /// Revision the table is at
    Revision,
}

/// `CREATE TABLE IF NOT EXISTS migrations`.
pub fn bootstrap_statement(dialect: Dialect) -> String {
    let statement = Table::create()
        .table(Migrations::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Migrations::Tablename)
                .string()
                .string_len(255)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Migrations::Revision)
                .big_integer()
                .not_null(),
        )
        .to_owned();

    dialect.schema(&statement)
}

/// Creates the `migrations` table if needed.
pub async fn bootstrap<DB>(conn: &mut DB::Connection, dialect: Dialect) -> Result<(), MigrationError>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
{
    sqlx::raw_sql(&bootstrap_statement(dialect))
        .execute(&mut *conn)
        .await
        .map_err(MigrationError::RevisionStore)?;

    Ok(())
}

/// Revision `table` is at, `0` when it was never migrated.
pub async fn get_revision<DB>(
    conn: &mut DB::Connection,
    dialect: Dialect,
    table: &'static str,
) -> Result<u32, MigrationError>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
    sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
    i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    usize: sqlx::ColumnIndex<DB::Row>,
{
    bootstrap::<DB>(conn, dialect).await?;

    let statement = Query::select()
        .column(Migrations::Revision)
        .from(Migrations::Table)
        .and_where(Expr::col(Migrations::Tablename).eq(table))
        .limit(1)
        .to_owned();

    let (sql, values) = dialect.build_sqlx(&statement);

    let Some((revision,)) = sqlx::query_as_with::<DB, (i64,), _>(&sql, values)
        .fetch_optional(&mut *conn)
        .await
        .map_err(MigrationError::RevisionStore)?
    else {
        return Ok(0);
    };

    u32::try_from(revision).map_err(|_| MigrationError::InvalidRevisionRecord {
        table,
        value: revision,
    })
}

/// Records that `table` is at `revision`.
///
/// Runs on the connection of the step transaction so the record commits with
/// the schema change it describes.
pub async fn set_revision<DB>(
    conn: &mut DB::Connection,
    dialect: Dialect,
    table: &'static str,
    revision: u32,
) -> Result<(), sqlx::Error>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
    sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
{
    let statement = Query::insert()
        .into_table(Migrations::Table)
        .columns([Migrations::Tablename, Migrations::Revision])
        .values_panic([table.into(), i64::from(revision).into()])
        .on_conflict(
            OnConflict::column(Migrations::Tablename)
                .update_column(Migrations::Revision)
                .to_owned(),
        )
        .to_owned();

    let (sql, values) = dialect.build_sqlx(&statement);

    sqlx::query_with::<DB, _>(&sql, values)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Deletes the record of `table`.
pub async fn forget<DB>(
    conn: &mut DB::Connection,
    dialect: Dialect,
    table: &'static str,
) -> Result<(), sqlx::Error>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
    sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
{
    let statement = Query::delete()
        .from_table(Migrations::Table)
        .and_where(Expr::col(Migrations::Tablename).eq(table))
        .to_owned();

    let (sql, values) = dialect.build_sqlx(&statement);

    sqlx::query_with::<DB, _>(&sql, values)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
