//! DDL patches and their execution order.
//!
//! A [`Patch`] renders one statement (or one `ALTER TABLE` clause). A
//! [`PatchPlan`] collects the patches of one table and emits them in a fixed
//! order: index drops, view drops, NULL backfills, a single combined
//! `ALTER TABLE`, table creation, view creation, index creation.

use std::fmt;

use super::snapshot::{SqlColumn, SqlIndex};

/// One queued DDL operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// `ADD COLUMN` clause.
    AddColumn(SqlColumn),
    /// `ALTER COLUMN .. TYPE` clause.
    AlterColumnType(SqlColumn),
    /// `ALTER COLUMN .. SET|DROP NOT NULL` clause.
    AlterColumnNullable(SqlColumn),
    /// `ALTER COLUMN .. SET|DROP DEFAULT` clause.
    AlterColumnDefault(SqlColumn),
    /// Backfills NULLs with the column default before tightening.
    UpdateNulls {
        /// Namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Target column.
        column: SqlColumn,
    },
    /// Drops an index.
    DropIndex {
        /// Namespace.
        schema: String,
        /// Table-name prefix of the physical index name; empty for orphans.
        table: String,
        /// Declared or physical index name.
        index: String,
        /// Unconditional drop, without `IF EXISTS`.
        force: bool,
    },
    /// Creates an index.
    CreateIndex {
        /// Namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Index definition.
        index: SqlIndex,
    },
    /// Creates a table.
    CreateTable {
        /// Namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Columns, in emission order.
        columns: Vec<SqlColumn>,
    },
    /// Creates a view.
    CreateView {
        /// Namespace.
        schema: String,
        /// View name.
        table: String,
        /// Resolved query.
        query: String,
        /// Materialized view.
        materialized: bool,
    },
    /// Drops a view.
    DropView {
        /// Namespace.
        schema: String,
        /// View name.
        table: String,
        /// Materialized view.
        materialized: bool,
    },
}

impl Patch {
    /// Returns whether this patch is a clause of the combined `ALTER TABLE`.
    #[must_use]
    pub const fn is_column_clause(&self) -> bool {
        matches!(
            self,
            Self::AddColumn(_)
                | Self::AlterColumnType(_)
                | Self::AlterColumnNullable(_)
                | Self::AlterColumnDefault(_)
        )
    }
}

fn column_def(f: &mut fmt::Formatter<'_>, col: &SqlColumn) -> fmt::Result {
    write!(f, "{} {}", col.name, col.data_type)?;
    if col.not_null {
        f.write_str(" NOT NULL")?;
    }
    if !col.default_value.is_empty() && !col.primary_key {
        write!(f, " DEFAULT {}", col.default_value)?;
    }
    Ok(())
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddColumn(col) => {
                f.write_str("ADD COLUMN ")?;
                column_def(f, col)
            }
            Self::AlterColumnType(col) => {
                write!(f, "ALTER COLUMN {} TYPE {}", col.name, col.data_type)
            }
            Self::AlterColumnNullable(col) => {
                let action = if col.not_null { "SET" } else { "DROP" };
                write!(f, "ALTER COLUMN {} {action} NOT NULL", col.name)
            }
            Self::AlterColumnDefault(col) => {
                if !col.default_value.is_empty() && !col.primary_key {
                    write!(
                        f,
                        "ALTER COLUMN {} SET DEFAULT {}",
                        col.name, col.default_value
                    )
                } else {
                    write!(f, "ALTER COLUMN {} DROP DEFAULT", col.name)
                }
            }
            Self::UpdateNulls {
                schema,
                table,
                column,
            } => write!(
                f,
                "UPDATE {schema}.{table} SET {col} = {def} WHERE {col} IS NULL",
                col = column.name,
                def = column.default_value
            ),
            Self::DropIndex {
                schema,
                table,
                index,
                force,
            } => {
                let guard = if *force { "" } else { "IF EXISTS " };
                write!(f, "DROP INDEX {guard}{schema}.{table}{index}")
            }
            Self::CreateIndex {
                schema,
                table,
                index,
            } => {
                f.write_str("CREATE")?;
                if index.is_unique {
                    f.write_str(" UNIQUE")?;
                }
                f.write_str(" INDEX")?;
                if index.concurrently {
                    f.write_str(" CONCURRENTLY")?;
                }
                write!(f, " {table}{} ON {schema}.{table}", index.name)?;
                if !index.method.is_empty() {
                    write!(f, " USING {}", index.method)?;
                }
                write!(f, "({}", index.columns.join(", "))?;
                if !index.options.is_empty() {
                    write!(f, " {}", index.options)?;
                }
                f.write_str(")")?;
                if !index.with.is_empty() {
                    write!(f, " WITH {}", index.with)?;
                }
                if !index.where_clause.is_empty() {
                    write!(f, " WHERE {}", index.where_clause)?;
                }
                Ok(())
            }
            Self::CreateTable {
                schema,
                table,
                columns,
            } => {
                write!(f, "CREATE TABLE {schema}.{table} (")?;
                let mut pks = Vec::new();
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    column_def(f, col)?;
                    if col.primary_key {
                        pks.push(col.name.as_str());
                    }
                }
                if !pks.is_empty() {
                    pks.sort_unstable();
                    if !columns.is_empty() {
                        f.write_str(",")?;
                    }
                    write!(f, "PRIMARY KEY ({})", pks.join(","))?;
                }
                f.write_str(")")
            }
            Self::CreateView {
                schema,
                table,
                query,
                materialized,
            } => {
                if *materialized {
                    write!(f, "CREATE MATERIALIZED VIEW {schema}.{table} AS {query}")
                } else {
                    write!(f, "CREATE OR REPLACE VIEW {schema}.{table} AS {query}")
                }
            }
            Self::DropView {
                schema,
                table,
                materialized,
            } => {
                let kind = if *materialized { "MATERIALIZED VIEW" } else { "VIEW" };
                write!(f, "DROP {kind} IF EXISTS {schema}.{table}")
            }
        }
    }
}

/// Patches accumulated for one table during one migration run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchPlan {
    schema: String,
    table: String,
    drop_indexes: Vec<Patch>,
    drop_views: Vec<Patch>,
    update_nulls: Vec<Patch>,
    alter_columns: Vec<Patch>,
    create_tables: Vec<Patch>,
    create_views: Vec<Patch>,
    create_indexes: Vec<Patch>,
}

impl PatchPlan {
    /// Creates an empty plan for `schema.table`.
    #[must_use]
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            ..Self::default()
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Queues a patch in the slot its kind belongs to.
    pub fn push(&mut self, patch: Patch) {
        let queue = match &patch {
            Patch::DropIndex { .. } => &mut self.drop_indexes,
            Patch::DropView { .. } => &mut self.drop_views,
            Patch::UpdateNulls { .. } => &mut self.update_nulls,
            Patch::CreateTable { .. } => &mut self.create_tables,
            Patch::CreateView { .. } => &mut self.create_views,
            Patch::CreateIndex { .. } => &mut self.create_indexes,
            Patch::AddColumn(_)
            | Patch::AlterColumnType(_)
            | Patch::AlterColumnNullable(_)
            | Patch::AlterColumnDefault(_) => &mut self.alter_columns,
        };
        queue.push(patch);
    }

    /// Queues a `CREATE INDEX` for this table.
    pub fn create_index(&mut self, index: SqlIndex) {
        self.push(Patch::CreateIndex {
            schema: self.schema.clone(),
            table: self.table.clone(),
            index,
        });
    }

    /// Queues a `DROP INDEX IF EXISTS` for one of this table's declared indexes.
    pub fn drop_index(&mut self, index: impl Into<String>) {
        self.push(Patch::DropIndex {
            schema: self.schema.clone(),
            table: self.table.clone(),
            index: index.into(),
            force: false,
        });
    }

    /// Queues an unconditional `DROP INDEX` by physical name.
    pub fn force_drop_index(&mut self, physical_name: impl Into<String>) {
        self.push(Patch::DropIndex {
            schema: self.schema.clone(),
            table: String::new(),
            index: physical_name.into(),
            force: true,
        });
    }

    /// Returns all queued patches in execution order.
    pub fn patches(&self) -> impl Iterator<Item = &Patch> {
        self.drop_indexes
            .iter()
            .chain(&self.drop_views)
            .chain(&self.update_nulls)
            .chain(&self.alter_columns)
            .chain(&self.create_tables)
            .chain(&self.create_views)
            .chain(&self.create_indexes)
    }

    /// Returns the number of queued patches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches().count()
    }

    /// Returns whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches().next().is_none()
    }

    /// Renders the plan into statements, in execution order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        let render = |patches: &[Patch]| patches.iter().map(ToString::to_string).collect::<Vec<_>>();

        let mut out = render(&self.drop_indexes);
        out.extend(render(&self.drop_views));
        out.extend(render(&self.update_nulls));
        if !self.alter_columns.is_empty() {
            out.push(format!(
                "ALTER TABLE {}.{} {}",
                self.schema,
                self.table,
                render(&self.alter_columns).join(", ")
            ));
        }
        out.extend(render(&self.create_tables));
        out.extend(render(&self.create_views));
        out.extend(render(&self.create_indexes));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str, not_null: bool, default: &str) -> SqlColumn {
        SqlColumn {
            name: name.to_string(),
            data_type: ty.to_string(),
            default_value: default.to_string(),
            not_null,
            primary_key: false,
        }
    }

    #[test]
    fn test_column_clauses() {
        let c = col("n", "INT", true, "0");
        assert_eq!(Patch::AddColumn(c.clone()).to_string(), "ADD COLUMN n INT NOT NULL DEFAULT 0");
        assert_eq!(Patch::AlterColumnType(c.clone()).to_string(), "ALTER COLUMN n TYPE INT");
        assert_eq!(
            Patch::AlterColumnNullable(c.clone()).to_string(),
            "ALTER COLUMN n SET NOT NULL"
        );
        assert_eq!(
            Patch::AlterColumnDefault(c.clone()).to_string(),
            "ALTER COLUMN n SET DEFAULT 0"
        );

        let loose = col("n", "INT", false, "");
        assert_eq!(Patch::AddColumn(loose.clone()).to_string(), "ADD COLUMN n INT");
        assert_eq!(
            Patch::AlterColumnNullable(loose.clone()).to_string(),
            "ALTER COLUMN n DROP NOT NULL"
        );
        assert_eq!(
            Patch::AlterColumnDefault(loose).to_string(),
            "ALTER COLUMN n DROP DEFAULT"
        );

        let mut pk = col("id", "UUID", true, "gen_random_uuid()");
        pk.primary_key = true;
        assert_eq!(Patch::AddColumn(pk.clone()).to_string(), "ADD COLUMN id UUID NOT NULL");
        assert_eq!(Patch::AlterColumnDefault(pk).to_string(), "ALTER COLUMN id DROP DEFAULT");
    }

    #[test]
    fn test_create_index_rendering() {
        let mut plan = PatchPlan::new("s", "t");
        plan.create_index(SqlIndex {
            name: "ab".to_string(),
            is_unique: true,
            columns: vec!["a".to_string(), "b".to_string()],
            ..SqlIndex::default()
        });
        plan.create_index(SqlIndex {
            name: "doc".to_string(),
            method: "gin".to_string(),
            columns: vec!["doc".to_string()],
            options: "jsonb_path_ops".to_string(),
            concurrently: true,
            with: "(fastupdate = off)".to_string(),
            where_clause: "doc IS NOT NULL".to_string(),
            ..SqlIndex::default()
        });
        assert_eq!(
            plan.queries(),
            [
                "CREATE UNIQUE INDEX tab ON s.t(a, b)",
                "CREATE INDEX CONCURRENTLY tdoc ON s.t USING gin(doc jsonb_path_ops) WITH (fastupdate = off) WHERE doc IS NOT NULL",
            ]
        );
    }

    #[test]
    fn test_create_table_rendering() {
        let mut id = col("id", "UUID", true, "");
        id.primary_key = true;
        let patch = Patch::CreateTable {
            schema: "s".to_string(),
            table: "t".to_string(),
            columns: vec![col("a", "INT", true, "0"), col("b", "TEXT", false, ""), id],
        };
        assert_eq!(
            patch.to_string(),
            "CREATE TABLE s.t (a INT NOT NULL DEFAULT 0,b TEXT,id UUID NOT NULL,PRIMARY KEY (id))"
        );
    }

    #[test]
    fn test_drop_and_view_rendering() {
        let mut plan = PatchPlan::new("s", "t");
        plan.drop_index("ab");
        plan.force_drop_index("tlegacy");
        assert_eq!(
            plan.queries(),
            ["DROP INDEX IF EXISTS s.tab", "DROP INDEX s.tlegacy"]
        );

        let view = Patch::CreateView {
            schema: "s".to_string(),
            table: "v".to_string(),
            query: "SELECT 1".to_string(),
            materialized: false,
        };
        assert_eq!(view.to_string(), "CREATE OR REPLACE VIEW s.v AS SELECT 1");
        let drop = Patch::DropView {
            schema: "s".to_string(),
            table: "v".to_string(),
            materialized: true,
        };
        assert_eq!(drop.to_string(), "DROP MATERIALIZED VIEW IF EXISTS s.v");
    }

    #[test]
    fn test_plan_order_and_combined_alter() {
        let mut plan = PatchPlan::new("s", "t");
        let tightened = col("n", "INT", true, "'0'");
        plan.create_index(SqlIndex {
            name: "n".to_string(),
            columns: vec!["n".to_string()],
            ..SqlIndex::default()
        });
        plan.push(Patch::AlterColumnNullable(tightened.clone()));
        plan.push(Patch::AddColumn(col("m", "TEXT", false, "")));
        plan.push(Patch::UpdateNulls {
            schema: "s".to_string(),
            table: "t".to_string(),
            column: tightened,
        });
        plan.drop_index("n");

        assert_eq!(plan.len(), 5);
        assert_eq!(
            plan.queries(),
            [
                "DROP INDEX IF EXISTS s.tn",
                "UPDATE s.t SET n = '0' WHERE n IS NULL",
                "ALTER TABLE s.t ALTER COLUMN n SET NOT NULL, ADD COLUMN m TEXT",
                "CREATE INDEX tn ON s.t(n)",
            ]
        );
        assert!(PatchPlan::new("s", "t").is_empty());
    }
}
