//! Migration orchestrator.
//!
//! Brings every registered model of a [`Store`] in line with its
//! declaration, in registration order, inside one transaction. Each table is
//! compared against its stored snapshot and the live catalog; only the
//! difference is executed, so a repeated run over unchanged models executes
//! no DDL.

use pgshape_core::migrations::{LiveIndex, is_up_to_date, plan_alter, plan_create};
use pgshape_core::{ModelDescriptor, PatchPlan, SqlModel, Store};
use serde::Serialize;
use sqlx::postgres::PgPool;
use tracing::{debug, info, warn};

use crate::backend::SchemaBackend;
use crate::error::{MigrateError, Phase, Result};
use crate::hooks::{MigrationContext, MigrationHooks, NoHooks};
use crate::postgres::PgBackend;

// ================================================================
// Reporting
// ================================================================

/// What a run did to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableAction {
    /// The table or view did not exist and was created.
    Created,
    /// The table or view was changed, or an existing table was adopted.
    Altered,
    /// Nothing differed.
    Unchanged,
    /// Altering failed and a hook suppressed the error.
    Suppressed,
}

/// Outcome of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Table name.
    pub table: String,
    /// Action taken.
    pub action: TableAction,
    /// DDL statements, in execution order.
    pub statements: Vec<String>,
}

impl TableReport {
    fn new(table: &str, action: TableAction, statements: Vec<String>) -> Self {
        Self {
            table: table.to_string(),
            action,
            statements,
        }
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Namespace migrated.
    pub namespace: String,
    /// Nothing was executed or persisted.
    pub dry_run: bool,
    /// One entry per registered model, in registration order.
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    /// Returns the report of one table.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Returns every DDL statement of the run.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .flat_map(|t| t.statements.iter().map(String::as_str))
    }

    /// Returns whether no table needed a change.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.tables
            .iter()
            .all(|t| t.action == TableAction::Unchanged)
    }
}

// ================================================================
// Migrator
// ================================================================

/// Migrates the models of a store.
pub struct Migrator<'s, H = NoHooks> {
    store: &'s Store,
    hooks: H,
    dry_run: bool,
}

impl<'s> Migrator<'s> {
    /// Creates a migrator without hooks.
    #[must_use]
    pub const fn new(store: &'s Store) -> Self {
        Self {
            store,
            hooks: NoHooks,
            dry_run: false,
        }
    }
}

impl<'s, H: MigrationHooks> Migrator<'s, H> {
    /// Replaces the hooks.
    #[must_use]
    pub fn with_hooks<T: MigrationHooks>(self, hooks: T) -> Migrator<'s, T> {
        Migrator {
            store: self.store,
            hooks,
            dry_run: self.dry_run,
        }
    }

    /// Enables dry-run mode: DDL is rendered and logged but not executed,
    /// no snapshot is saved, hooks are not called and the transaction is
    /// rolled back.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Runs the migration in a new transaction on `pool`.
    pub async fn run(&self, pool: &PgPool) -> Result<MigrationReport> {
        let mut backend = PgBackend::begin(pool).await?;
        self.run_with(&mut backend).await
    }

    /// Runs the migration on an open backend, then commits it (or rolls it
    /// back in dry-run mode or on error).
    pub async fn run_with(&self, backend: &mut dyn SchemaBackend) -> Result<MigrationReport> {
        let schema = self.store.namespace();
        info!(
            namespace = %schema,
            models = self.store.models().len(),
            dry_run = self.dry_run,
            "Starting migration"
        );

        let report = match self.migrate_all(backend).await {
            Ok(report) => report,
            Err(err) => {
                warn!(namespace = %schema, error = %err, "Migration failed, rolling back");
                if let Err(rollback) = backend.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(err);
            }
        };

        if self.dry_run {
            backend.rollback().await?;
            info!(
                namespace = %schema,
                statements = report.statements().count(),
                "Dry run finished"
            );
            return Ok(report);
        }

        backend.commit().await?;
        info!(
            namespace = %schema,
            statements = report.statements().count(),
            "Migration committed"
        );
        self.hooks.after_commit(&report).await?;
        Ok(report)
    }

    async fn migrate_all(&self, backend: &mut dyn SchemaBackend) -> Result<MigrationReport> {
        let schema = self.store.namespace();
        backend
            .ensure_schema(schema)
            .await
            .map_err(|e| e.in_phase(Phase::EnsureSchema, schema))?;

        let mut report = MigrationReport {
            namespace: schema.to_string(),
            dry_run: self.dry_run,
            tables: Vec::with_capacity(self.store.models().len()),
        };
        for md in self.store.models() {
            report.tables.push(self.migrate_model(backend, md).await?);
        }
        Ok(report)
    }

    async fn migrate_model(
        &self,
        backend: &mut dyn SchemaBackend,
        md: &ModelDescriptor,
    ) -> Result<TableReport> {
        let schema = self.store.namespace();
        let table = md.table();

        let live_indexes = backend
            .live_indexes(schema, table)
            .await
            .map_err(|e| e.in_phase(Phase::Introspect, table))?;
        let last = backend
            .load_snapshot(schema, table)
            .await
            .map_err(|e| e.in_phase(Phase::LoadSnapshot, table))?;
        let phase = if last.is_empty() {
            Phase::Create
        } else {
            Phase::Alter
        };
        let desired = self
            .store
            .desired_model(md)
            .map_err(|e| MigrateError::from(e).in_phase(phase, table))?;
        let ctx = MigrationContext {
            schema,
            model: md,
            last: &last,
            desired: &desired,
        };

        if last.is_empty() && !self.exists(backend, &desired).await? {
            let statements = self
                .apply(backend, &plan_create(schema, &desired), Phase::Create)
                .await?;
            self.save(backend, &desired).await?;
            if !self.dry_run {
                self.hooks
                    .after_create(&mut *backend, ctx)
                    .await
                    .map_err(|e| e.in_phase(Phase::Hook, table))?;
            }
            return Ok(TableReport::new(table, TableAction::Created, statements));
        }

        let report = if is_up_to_date(&last, &desired, &live_indexes) {
            debug!(table = %table, "Table is up to date");
            TableReport::new(table, TableAction::Unchanged, Vec::new())
        } else {
            match self.alter(backend, &last, &desired, &live_indexes).await {
                Ok(statements) => TableReport::new(table, TableAction::Altered, statements),
                Err(err) if self.dry_run => return Err(err),
                Err(err) => {
                    self.hooks
                        .after_alter_error(&mut *backend, ctx, err)
                        .await?;
                    warn!(table = %table, "Alter error suppressed by hook");
                    TableReport::new(table, TableAction::Suppressed, Vec::new())
                }
            }
        };

        if !self.dry_run {
            self.hooks
                .after_migrate(&mut *backend, ctx)
                .await
                .map_err(|e| e.in_phase(Phase::Hook, table))?;
        }
        Ok(report)
    }

    /// Returns whether a table without snapshot already has live columns.
    async fn exists(&self, backend: &mut dyn SchemaBackend, desired: &SqlModel) -> Result<bool> {
        if desired.is_view {
            return Ok(false);
        }
        let live = backend
            .live_columns(self.store.namespace(), &desired.table)
            .await
            .map_err(|e| e.in_phase(Phase::Introspect, &desired.table))?;
        if !live.is_empty() {
            info!(table = %desired.table, columns = live.len(), "Adopting existing table");
        }
        Ok(!live.is_empty())
    }

    async fn alter(
        &self,
        backend: &mut dyn SchemaBackend,
        last: &SqlModel,
        desired: &SqlModel,
        live_indexes: &[LiveIndex],
    ) -> Result<Vec<String>> {
        let schema = self.store.namespace();
        let table = desired.table.as_str();

        let live_columns = if desired.is_view {
            Vec::new()
        } else {
            backend
                .live_columns(schema, table)
                .await
                .map_err(|e| e.in_phase(Phase::Introspect, table))?
        };
        let plan = plan_alter(schema, last, desired, &live_columns, live_indexes)
            .map_err(|e| MigrateError::from(e).in_phase(Phase::Alter, table))?;

        let statements = self.apply(backend, &plan, Phase::Alter).await?;
        self.save(backend, desired).await?;
        Ok(statements)
    }

    async fn apply(
        &self,
        backend: &mut dyn SchemaBackend,
        plan: &PatchPlan,
        phase: Phase,
    ) -> Result<Vec<String>> {
        let statements = plan.queries();
        for sql in &statements {
            if self.dry_run {
                info!(table = %plan.table(), sql = %sql, "Would execute");
                continue;
            }
            info!(table = %plan.table(), sql = %sql, "Executing");
            backend
                .execute(sql)
                .await
                .map_err(|e| e.in_phase(phase, plan.table()))?;
        }
        Ok(statements)
    }

    async fn save(&self, backend: &mut dyn SchemaBackend, desired: &SqlModel) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        backend
            .save_snapshot(self.store.namespace(), desired)
            .await
            .map_err(|e| e.in_phase(Phase::SaveSnapshot, &desired.table))
    }
}
