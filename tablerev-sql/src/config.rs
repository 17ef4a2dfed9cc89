//! Configuration of a migrator.

/// Options of a [`Migrator`](crate::Migrator) run.
#[derive(Clone, Debug)]
pub struct MigratorConfig {
    /// Label carried on the `migrate_tables` span.
    pub name: String,

    /// Never bring a table past this revision.
    pub stop_at_revision: Option<u32>,

    /// Drop every table of the script, and forget its revision, before migrating.
    pub delete_tables_before: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            name: "tablerev".to_owned(),
            stop_at_revision: None,
            delete_tables_before: false,
        }
    }
}
