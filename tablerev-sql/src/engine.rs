//! Running migration scripts against a database.

use sqlx::{Connection, Database, Pool};
use tablerev_core::{MigrationElement, Script, TableHistory, TablePlan};

use crate::{store, synth, Dialect, MigrationError, MigratorConfig};

/// What happened to one table during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The table did not exist and was created at `revision`.
    Created { revision: u32 },
    /// The table was stepped from revision `from` to `to`.
    Migrated { from: u32, to: u32 },
    UpToDate { revision: u32 },
    /// The stored revision is newer than anything the script defines.
    Ahead { stored: u32, latest: u32 },
}

impl Outcome {
    /// Revision the table is at after the run.
    pub fn revision(&self) -> u32 {
        match *self {
            Outcome::Created { revision } | Outcome::UpToDate { revision } => revision,
            Outcome::Migrated { to, .. } => to,
            Outcome::Ahead { stored, .. } => stored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub outcome: Outcome,
    /// Schema statements executed for this table, in order.
    pub statements: Vec<String>,
}

/// Result of a successful run, one entry per table in script order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Number of schema statements executed over all tables.
    pub fn statement_count(&self) -> usize {
        self.tables.iter().map(|t| t.statements.len()).sum()
    }
}

/// Brings every table of `script` to its newest revision.
///
/// ```rust,ignore
/// let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
/// let report = tablerev_sql::migrate_tables(&pool, MIGRATIONS).await?;
/// ```
pub async fn migrate_tables<DB>(
    pool: &Pool<DB>,
    script: &'static [MigrationElement],
) -> Result<MigrationReport, MigrationError>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
    sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
    i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    usize: sqlx::ColumnIndex<DB::Row>,
{
    Migrator::new(script).run(pool).await
}

/// Applies a migration script.
///
/// # Example
///
/// ```rust,ignore
/// use tablerev_sql::Migrator;
///
/// let report = Migrator::new(MIGRATIONS)
///     .name("estates")
///     .stop_at_revision(2)
///     .run(&pool)
///     .await?;
///
/// assert_eq!(report.table("estates").map(|t| t.outcome.revision()), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct Migrator {
    script: &'static [MigrationElement],
    config: MigratorConfig,
}

impl Migrator {
    pub fn new(script: &'static [MigrationElement]) -> Self {
        Self {
            script,
            config: MigratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MigratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn stop_at_revision(mut self, revision: u32) -> Self {
        self.config.stop_at_revision = Some(revision);
        self
    }

    pub fn delete_tables_before(mut self, enabled: bool) -> Self {
        self.config.delete_tables_before = enabled;
        self
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Validates the script without touching any database.
    pub fn validate(&self) -> Result<Script, MigrationError> {
        Ok(Script::parse(self.script)?)
    }

    /// Runs the script on one connection taken from `pool`.
    pub async fn run<DB>(&self, pool: &Pool<DB>) -> Result<MigrationReport, MigrationError>
    where
        DB: Database,
        for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
        sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
        i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
        usize: sqlx::ColumnIndex<DB::Row>,
    {
        self.validate()?;

        let mut conn = pool.acquire().await.map_err(MigrationError::Connection)?;

        self.run_on_connection::<DB>(&mut *conn).await
    }

    /// Runs the script on `conn`.
    ///
    /// The whole script is validated first; a definition error is returned
    /// before any statement reaches the database.
    #[tracing::instrument(skip_all, name = "migrate_tables", fields(migrator = %self.config.name))]
    pub async fn run_on_connection<DB>(
        &self,
        conn: &mut DB::Connection,
    ) -> Result<MigrationReport, MigrationError>
    where
        DB: Database,
        for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
        sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
        i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
        usize: sqlx::ColumnIndex<DB::Row>,
    {
        let script = self.validate()?;
        let dialect = Dialect::of::<DB>()?;

        if self.config.delete_tables_before {
            delete_tables::<DB>(conn, dialect, &script).await?;
        }

        let mut report = MigrationReport::default();

        for table in script.tables() {
            report
                .tables
                .push(self.migrate_table::<DB>(conn, dialect, table).await?);
        }

        Ok(report)
    }

    async fn migrate_table<DB>(
        &self,
        conn: &mut DB::Connection,
        dialect: Dialect,
        table: &TableHistory,
    ) -> Result<TableReport, MigrationError>
    where
        DB: Database,
        for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
        sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
        i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
        usize: sqlx::ColumnIndex<DB::Row>,
    {
        let name = table.name();
        let stored = store::get_revision::<DB>(conn, dialect, name).await?;
        let mut statements = Vec::new();

        let outcome = match table.plan(stored, self.config.stop_at_revision) {
            TablePlan::Create { revision } => {
                tracing::info!(table = name, revision, "creating table");

                let Some(state) = table.state_at(revision) else {
                    return Err(unknown_revision(name, revision));
                };

                let batch = synth::create_table(dialect, state);
                commit_revision::<DB>(conn, dialect, name, revision, &batch).await?;
                statements.extend(batch);

                Outcome::Created { revision }
            }
            TablePlan::Step { from, to } => {
                for revision in from + 1..=to {
                    tracing::info!(table = name, revision, "migrating table");

                    let (Some(before), Some(step)) =
                        (table.state_at(revision - 1), table.step(revision))
                    else {
                        return Err(unknown_revision(name, revision));
                    };

                    let batch = synth::apply_step(dialect, before, step)?;
                    commit_revision::<DB>(conn, dialect, name, revision, &batch).await?;
                    statements.extend(batch);
                }

                Outcome::Migrated { from, to }
            }
            TablePlan::UpToDate { revision } => {
                tracing::debug!(table = name, revision, "table is up to date");

                Outcome::UpToDate { revision }
            }
            TablePlan::Ahead { stored, latest } => {
                tracing::warn!(
                    table = name,
                    stored,
                    latest,
                    "table revision is newer than its migration script"
                );

                Outcome::Ahead { stored, latest }
            }
        };

        Ok(TableReport {
            table: name,
            outcome,
            statements,
        })
    }
}

fn unknown_revision(table: &'static str, revision: u32) -> MigrationError {
    MigrationError::InvalidRevisionRecord {
        table,
        value: i64::from(revision),
    }
}

/// Runs `statements` and records `revision` in one transaction.
async fn commit_revision<DB>(
    conn: &mut DB::Connection,
    dialect: Dialect,
    table: &'static str,
    revision: u32,
    statements: &[String],
) -> Result<(), MigrationError>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
    sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
{
    let mut tx = conn
        .begin()
        .await
        .map_err(|source| MigrationError::Transaction { table, source })?;

    for statement in statements {
        let result = sqlx::raw_sql(statement).execute(&mut *tx).await;

        if let Err(source) = result {
            tracing::debug!(table, revision, statement = %statement, "migration statement failed");
            rollback(tx, table).await;

            return Err(MigrationError::Execution {
                table,
                revision,
                statement: statement.to_owned(),
                source,
            });
        }
    }

    let result = store::set_revision::<DB>(&mut *tx, dialect, table, revision).await;

    if let Err(source) = result {
        tracing::debug!(table, revision, "revision record failed");
        rollback(tx, table).await;

        return Err(MigrationError::Execution {
            table,
            revision,
            statement: format!("set revision of '{table}' to {revision}"),
            source,
        });
    }

    tx.commit()
        .await
        .map_err(|source| MigrationError::Transaction { table, source })
}

async fn rollback<DB: Database>(tx: sqlx::Transaction<'_, DB>, table: &'static str) {
    if let Err(err) = tx.rollback().await {
        tracing::error!(table, error = %err, "rollback failed");
    }
}

/// Drops every table of the script and forgets its revision.
async fn delete_tables<DB>(
    conn: &mut DB::Connection,
    dialect: Dialect,
    script: &Script,
) -> Result<(), MigrationError>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: sqlx::Executor<'c, Database = DB>,
    sea_query_sqlx::SqlxValues: for<'q> sqlx::IntoArguments<'q, DB>,
{
    store::bootstrap::<DB>(conn, dialect).await?;

    let mut tx = conn.begin().await.map_err(MigrationError::RevisionStore)?;

    for table in script.tables() {
        let name = table.name();
        tracing::info!(table = name, "deleting table");

        let statement = synth::drop_table(dialect, name);

        let result = sqlx::raw_sql(&statement).execute(&mut *tx).await;

        if let Err(source) = result {
            rollback(tx, name).await;

            return Err(MigrationError::Execution {
                table: name,
                revision: 0,
                statement,
                source,
            });
        }

        let result = store::forget::<DB>(&mut *tx, dialect, name).await;

        if let Err(source) = result {
            rollback(tx, name).await;

            return Err(MigrationError::Execution {
                table: name,
                revision: 0,
                statement: format!("forget revision of '{name}'"),
                source,
            });
        }
    }

    tx.commit().await.map_err(MigrationError::RevisionStore)
}
