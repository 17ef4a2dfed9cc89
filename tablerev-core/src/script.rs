//! Validation of whole migration scripts and per-table planning.

use crate::{element::MigrationElement, error::DefinitionError, state::TableState};

/// Name of the table holding applied revisions. Scripts may not declare it.
pub const REVISION_TABLE: &str = "migrations";

/// The elements of one revision and the table schema they lead to.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionStep {
    pub revision: u32,
    pub elements: Vec<MigrationElement>,
    /// Schema of the table once this revision is applied.
    pub state: TableState,
}

/// Full schema history of one table: revision 1 first.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHistory {
    name: &'static str,
    steps: Vec<RevisionStep>,
}

impl TableHistory {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps(&self) -> &[RevisionStep] {
        &self.steps
    }

    /// Newest revision the script defines for this table.
    pub fn latest_revision(&self) -> u32 {
        self.steps.last().map(|s| s.revision).unwrap_or_default()
    }

    pub fn step(&self, revision: u32) -> Option<&RevisionStep> {
        let index = usize::try_from(revision).ok()?.checked_sub(1)?;
        self.steps.get(index)
    }

    /// Schema of the table at `revision`.
    pub fn state_at(&self, revision: u32) -> Option<&TableState> {
        self.step(revision).map(|s| &s.state)
    }

    /// Decides what has to happen to a table currently stored at `stored`.
    ///
    /// `stop_at` caps the revision the table is brought to.
    pub fn plan(&self, stored: u32, stop_at: Option<u32>) -> TablePlan {
        let latest = self.latest_revision();
        let target = stop_at.map_or(latest, |stop| stop.min(latest));

        if stored > latest {
            return TablePlan::Ahead { stored, latest };
        }

        if stored == 0 && target > 0 {
            return TablePlan::Create { revision: target };
        }

        if stored >= target {
            return TablePlan::UpToDate { revision: stored };
        }

        TablePlan::Step {
            from: stored,
            to: target,
        }
    }
}

/// What the engine does with one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePlan {
    /// The table does not exist yet: create it directly at `revision`.
    Create { revision: u32 },
    /// Apply every step from `from + 1` to `to`, one transaction each.
    Step { from: u32, to: u32 },
    /// Nothing to do.
    UpToDate { revision: u32 },
    /// The database knows a revision the script does not define.
    Ahead { stored: u32, latest: u32 },
}

/// A validated migration script.
///
/// Parsing folds every table group completely, so any structural error in any
/// table is reported before a single statement is issued.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    tables: Vec<TableHistory>,
}

impl Script {
    pub fn parse(elements: &[MigrationElement]) -> Result<Self, DefinitionError> {
        let Some(first) = elements.first() else {
            return Err(DefinitionError::EmptyScript);
        };

        if !matches!(first, MigrationElement::Table(_)) {
            return Err(DefinitionError::MissingTableDeclaration(first.kind()));
        }

        let mut tables: Vec<TableHistory> = Vec::new();
        let mut group = Vec::new();

        for element in elements {
            if let MigrationElement::Table(_) = element {
                if !group.is_empty() {
                    tables.push(parse_group(&group, &tables)?);
                    group.clear();
                }
            }
            group.push(*element);
        }

        tables.push(parse_group(&group, &tables)?);

        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[TableHistory] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableHistory> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Highest revision defined by any table of the script.
    pub fn max_revision(&self) -> u32 {
        self.tables
            .iter()
            .map(TableHistory::latest_revision)
            .max()
            .unwrap_or_default()
    }
}

fn parse_group(
    group: &[MigrationElement],
    known: &[TableHistory],
) -> Result<TableHistory, DefinitionError> {
    let (name, body) = match group.split_first() {
        Some((MigrationElement::Table(name), body)) => (*name, body),
        Some((other, _)) => return Err(DefinitionError::MissingTableDeclaration(other.kind())),
        None => return Err(DefinitionError::EmptyScript),
    };

    if name == REVISION_TABLE {
        return Err(DefinitionError::ReservedTable(name));
    }

    if known.iter().any(|t| t.name == name) {
        return Err(DefinitionError::DuplicateTable(name));
    }

    let mut steps = Vec::new();
    let mut state = TableState::new(name);
    let mut revision = 1;
    let mut elements = Vec::new();

    for element in body {
        match element {
            MigrationElement::Revision(next) => {
                if *next != revision + 1 {
                    return Err(DefinitionError::InvalidRevision {
                        table: name,
                        expected: revision + 1,
                        actual: *next,
                    });
                }

                steps.push(close_step(revision, &mut elements, &state)?);
                revision = *next;
            }
            MigrationElement::Table(_) => {
                return Err(DefinitionError::MissingTableDeclaration(element.kind()))
            }
            _ => {
                state = state.apply(element)?;
                elements.push(*element);
            }
        }
    }

    steps.push(close_step(revision, &mut elements, &state)?);

    Ok(TableHistory { name, steps })
}

fn close_step(
    revision: u32,
    elements: &mut Vec<MigrationElement>,
    state: &TableState,
) -> Result<RevisionStep, DefinitionError> {
    if state.columns().is_empty() {
        return Err(DefinitionError::NoColumns {
            table: state.name(),
            revision,
        });
    }

    Ok(RevisionStep {
        revision,
        elements: std::mem::take(elements),
        state: state.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        column::{Column, ColumnType, DefaultValue},
        element::{ChangeColumn as Change, NamedKey as Key},
        MigrationElement::*,
    };

    static EXAMPLE: &[MigrationElement] = &[
        Table("t"),
        AddColumn(
            Column::new("a", ColumnType::Int)
                .not_null()
                .with_default(DefaultValue::Int(0)),
        ),
        PrimaryKey(&["a"]),
        Revision(2),
        AddColumn(Column::new("b", ColumnType::String)),
    ];

    static ASSETS: &[MigrationElement] = &[
        Table("assetrefs"),
        AddColumn(
            Column::new("id", ColumnType::Uuid)
                .not_null()
                .with_default(DefaultValue::ZERO_UUID),
        ),
        AddColumn(
            Column::new("CreatorID", ColumnType::Uuid)
                .not_null()
                .with_default(DefaultValue::ZERO_UUID),
        ),
        PrimaryKey(&["id"]),
        Revision(2),
        AddColumn(
            Column::new("usesprocessed", ColumnType::Bool)
                .not_null()
                .with_default(DefaultValue::Bool(false)),
        ),
        Revision(3),
        DropColumn("CreatorID"),
        Table("assetsinuse"),
        AddColumn(Column::new("id", ColumnType::Uuid).not_null()),
        AddColumn(Column::new("usesid", ColumnType::Uuid).not_null()),
        PrimaryKey(&["id", "usesid"]),
        NamedKey(Key::new("usesid", &["usesid"])),
    ];

    #[test]
    fn example_script_has_two_revisions() -> Result<(), DefinitionError> {
        let script = Script::parse(EXAMPLE)?;
        let table = &script.tables()[0];

        assert_eq!(table.name(), "t");
        assert_eq!(table.latest_revision(), 2);
        assert_eq!(table.steps()[0].elements.len(), 2);
        assert_eq!(table.steps()[1].elements.len(), 1);

        let first = table.state_at(1).map(|s| s.columns().len());
        let last = table.state_at(2).map(|s| s.columns().len());
        assert_eq!(first, Some(1));
        assert_eq!(last, Some(2));
        assert_eq!(table.state_at(2).and_then(|s| s.primary_key()), Some(&["a"][..]));
        assert!(table.state_at(3).is_none());
        assert!(table.state_at(0).is_none());

        Ok(())
    }

    #[test]
    fn groups_split_on_table_declarations() -> Result<(), DefinitionError> {
        let script = Script::parse(ASSETS)?;

        assert_eq!(script.tables().len(), 2);
        assert_eq!(script.max_revision(), 3);

        let assetrefs = script.table("assetrefs").expect("assetrefs");
        assert_eq!(assetrefs.latest_revision(), 3);
        assert!(assetrefs
            .state_at(3)
            .is_some_and(|s| s.column("CreatorID").is_none()));
        assert!(assetrefs
            .state_at(2)
            .is_some_and(|s| s.column("CreatorID").is_some()));

        let inuse = script.table("assetsinuse").expect("assetsinuse");
        assert_eq!(inuse.latest_revision(), 1);

        Ok(())
    }

    #[test]
    fn trailing_marker_is_an_empty_step() -> Result<(), DefinitionError> {
        let script = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            Revision(2),
        ])?;

        let table = &script.tables()[0];
        assert_eq!(table.latest_revision(), 2);
        assert!(table.steps()[1].elements.is_empty());

        Ok(())
    }

    #[test]
    fn empty_script() {
        assert_eq!(Script::parse(&[]), Err(DefinitionError::EmptyScript));
    }

    #[test]
    fn first_entry_must_be_table() {
        assert_eq!(
            Script::parse(&[AddColumn(Column::new("a", ColumnType::Int))]),
            Err(DefinitionError::MissingTableDeclaration("add column"))
        );
        assert_eq!(
            Script::parse(&[Revision(2), Table("t")]),
            Err(DefinitionError::MissingTableDeclaration("revision"))
        );
    }

    #[test]
    fn revisions_must_be_consecutive() {
        let err = Script::parse(&[
            Table("ok"),
            AddColumn(Column::new("a", ColumnType::Int)),
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            Revision(3),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::InvalidRevision {
                table: "t",
                expected: 2,
                actual: 3,
            })
        );

        let err = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            Revision(2),
            Revision(2),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::InvalidRevision {
                table: "t",
                expected: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn change_of_unknown_column() {
        let err = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            Revision(2),
            ChangeColumn(Change::new(Column::new("b", ColumnType::BigInt))),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::UnknownColumn {
                table: "t",
                kind: "change column",
                column: "b",
            })
        );

        let err = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            ChangeColumn(
                Change::new(Column::new("b", ColumnType::BigInt)).renamed_from("c"),
            ),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::UnknownColumn {
                table: "t",
                kind: "change column",
                column: "c",
            })
        );
    }

    #[test]
    fn drop_of_unknown_or_removed_column() {
        let err = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            AddColumn(Column::new("b", ColumnType::Int)),
            DropColumn("b"),
            Revision(2),
            DropColumn("b"),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::UnknownColumn {
                table: "t",
                kind: "drop column",
                column: "b",
            })
        );
    }

    #[test]
    fn duplicate_column() {
        let err = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            AddColumn(Column::new("a", ColumnType::String)),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::DuplicateColumn {
                table: "t",
                column: "a",
            })
        );
    }

    #[test]
    fn physical_column_names_collide() {
        let added = Script::parse(&[
            Table("c"),
            AddColumn(Column::new("Pos", ColumnType::Vector3)),
            AddColumn(Column::new("PosX", ColumnType::Double)),
        ]);

        assert_eq!(
            added,
            Err(DefinitionError::DuplicateColumn {
                table: "c",
                column: "PosX",
            })
        );

        let renamed = Script::parse(&[
            Table("c"),
            AddColumn(Column::new("posy", ColumnType::Double)),
            AddColumn(Column::new("Scale", ColumnType::Double)),
            Revision(2),
            ChangeColumn(
                Change::new(Column::new("Pos", ColumnType::EnvVector2)).renamed_from("Scale"),
            ),
        ]);

        assert_eq!(
            renamed,
            Err(DefinitionError::DuplicateColumn {
                table: "c",
                column: "Pos",
            })
        );

        let widened = Script::parse(&[
            Table("c"),
            AddColumn(Column::new("Pos", ColumnType::GridVector)),
            Revision(2),
            ChangeColumn(Change::new(Column::new("Pos", ColumnType::Vector3))),
        ]);

        assert!(widened.is_ok());
    }

    #[test]
    fn duplicate_and_reserved_tables() {
        let err = Script::parse(&[
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
            Table("t"),
            AddColumn(Column::new("a", ColumnType::Int)),
        ]);
        assert_eq!(err, Err(DefinitionError::DuplicateTable("t")));

        let err = Script::parse(&[
            Table("migrations"),
            AddColumn(Column::new("a", ColumnType::Int)),
        ]);
        assert_eq!(err, Err(DefinitionError::ReservedTable("migrations")));
    }

    #[test]
    fn table_without_columns() {
        assert_eq!(
            Script::parse(&[Table("t"), Table("u")]),
            Err(DefinitionError::NoColumns {
                table: "t",
                revision: 1,
            })
        );
    }

    #[test]
    fn mismatched_default() {
        let err = Script::parse(&[
            Table("t"),
            AddColumn(
                Column::new("p", ColumnType::Vector3)
                    .with_default(DefaultValue::Components(&[0.0, 0.0])),
            ),
        ]);

        assert_eq!(
            err,
            Err(DefinitionError::DefaultMismatch {
                table: "t",
                column: "p",
            })
        );
    }

    #[test]
    fn plan_new_table_jumps_to_latest() -> Result<(), DefinitionError> {
        let script = Script::parse(ASSETS)?;
        let table = script.table("assetrefs").expect("assetrefs");

        assert_eq!(table.plan(0, None), TablePlan::Create { revision: 3 });
        assert_eq!(table.plan(0, Some(1)), TablePlan::Create { revision: 1 });
        assert_eq!(table.plan(0, Some(9)), TablePlan::Create { revision: 3 });

        Ok(())
    }

    #[test]
    fn plan_existing_table() -> Result<(), DefinitionError> {
        let script = Script::parse(ASSETS)?;
        let table = script.table("assetrefs").expect("assetrefs");

        assert_eq!(table.plan(1, None), TablePlan::Step { from: 1, to: 3 });
        assert_eq!(table.plan(2, None), TablePlan::Step { from: 2, to: 3 });
        assert_eq!(table.plan(1, Some(2)), TablePlan::Step { from: 1, to: 2 });
        assert_eq!(table.plan(3, None), TablePlan::UpToDate { revision: 3 });
        assert_eq!(table.plan(2, Some(1)), TablePlan::UpToDate { revision: 2 });
        assert_eq!(
            table.plan(5, None),
            TablePlan::Ahead {
                stored: 5,
                latest: 3,
            }
        );

        Ok(())
    }
}
