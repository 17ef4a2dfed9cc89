//! SQL dialect selection and statement rendering.

#[cfg(feature = "mysql")]
use sea_query::MysqlQueryBuilder;
#[cfg(feature = "postgres")]
use sea_query::PostgresQueryBuilder;
#[cfg(feature = "sqlite")]
use sea_query::SqliteQueryBuilder;
use sea_query::{QueryStatementWriter, SchemaStatementBuilder};
use sea_query_sqlx::{SqlxBinder, SqlxValues};
use sqlx::Database;

use crate::MigrationError;

/// Database flavour a migration runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    #[cfg(feature = "sqlite")]
    Sqlite,
    #[cfg(feature = "mysql")]
    MySql,
    #[cfg(feature = "postgres")]
    Postgres,
}

impl Dialect {
    /// Dialect of a sqlx driver, selected from [`Database::NAME`].
    pub fn of<DB: Database>() -> Result<Self, MigrationError> {
        match DB::NAME {
            #[cfg(feature = "sqlite")]
            "SQLite" => Ok(Dialect::Sqlite),
            #[cfg(feature = "mysql")]
            "MySQL" => Ok(Dialect::MySql),
            #[cfg(feature = "postgres")]
            "PostgreSQL" => Ok(Dialect::Postgres),
            name => Err(MigrationError::UnsupportedDatabase(name.to_owned())),
        }
    }

    /// Renders a DDL statement.
    pub fn schema<S: SchemaStatementBuilder>(self, statement: &S) -> String {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => SchemaStatementBuilder::to_string(statement, SqliteQueryBuilder),
            #[cfg(feature = "mysql")]
            Dialect::MySql => SchemaStatementBuilder::to_string(statement, MysqlQueryBuilder),
            #[cfg(feature = "postgres")]
            Dialect::Postgres => {
                SchemaStatementBuilder::to_string(statement, PostgresQueryBuilder)
            }
        }
    }

    /// Renders a query that carries no user values.
    pub fn inline<S: QueryStatementWriter>(self, statement: &S) -> String {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => QueryStatementWriter::to_string(statement, SqliteQueryBuilder),
            #[cfg(feature = "mysql")]
            Dialect::MySql => QueryStatementWriter::to_string(statement, MysqlQueryBuilder),
            #[cfg(feature = "postgres")]
            Dialect::Postgres => QueryStatementWriter::to_string(statement, PostgresQueryBuilder),
        }
    }

    /// Builds a query with its values bound as parameters.
    pub fn build_sqlx<S: SqlxBinder>(self, statement: &S) -> (String, SqlxValues) {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => statement.build_sqlx(SqliteQueryBuilder),
            #[cfg(feature = "mysql")]
            Dialect::MySql => statement.build_sqlx(MysqlQueryBuilder),
            #[cfg(feature = "postgres")]
            Dialect::Postgres => statement.build_sqlx(PostgresQueryBuilder),
        }
    }

    /// Whether `ALTER TABLE` can change the type or constraints of a column.
    pub fn alters_columns(self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => false,
            #[cfg(feature = "mysql")]
            Dialect::MySql => true,
            #[cfg(feature = "postgres")]
            Dialect::Postgres => true,
        }
    }

    /// Whether a `NOT NULL` column without default can be added to a table in place.
    pub fn adds_required_columns(self) -> bool {
        self.alters_columns()
    }

    /// Whether constraint names share one namespace across the tables of a schema.
    pub fn has_schema_constraint_names(self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => false,
            #[cfg(feature = "mysql")]
            Dialect::MySql => false,
            #[cfg(feature = "postgres")]
            Dialect::Postgres => true,
        }
    }

    /// Whether changing a column's type keeps its previous default.
    pub fn keeps_default_on_modify(self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => false,
            #[cfg(feature = "mysql")]
            Dialect::MySql => false,
            #[cfg(feature = "postgres")]
            Dialect::Postgres => true,
        }
    }

    /// Quotes an identifier for statements sea-query has no builder for.
    pub fn quote(self, ident: &str) -> String {
        match self {
            #[cfg(feature = "mysql")]
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            #[allow(unreachable_patterns)]
            _ => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Whether `text`/`blob` columns have distinct large variants.
    pub fn has_long_types(self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => false,
            #[cfg(feature = "mysql")]
            Dialect::MySql => true,
            #[cfg(feature = "postgres")]
            Dialect::Postgres => false,
        }
    }
}
