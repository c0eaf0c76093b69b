//! Extension points called during a migration run.

use async_trait::async_trait;
use pgshape_core::{ModelDescriptor, SqlModel};

use crate::backend::SchemaBackend;
use crate::error::{MigrateError, Result};
use crate::migrator::MigrationReport;

/// What a hook knows about the table being migrated.
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext<'a> {
    /// Namespace of the run.
    pub schema: &'a str,
    /// Descriptor of the model.
    pub model: &'a ModelDescriptor,
    /// Snapshot before the run; empty for new tables.
    pub last: &'a SqlModel,
    /// Shape the table is migrated to.
    pub desired: &'a SqlModel,
}

impl MigrationContext<'_> {
    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.desired.table
    }
}

/// Callbacks around the migration of each table.
///
/// Per-table hooks receive the backend and run inside the migration
/// transaction; anything they execute commits or rolls back with it.
#[async_trait]
pub trait MigrationHooks: Send + Sync {
    /// Called after a new table was created and its snapshot stored.
    async fn after_create(
        &self,
        _backend: &mut dyn SchemaBackend,
        _ctx: MigrationContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called when altering an existing table failed.
    ///
    /// Returning an error aborts the run with it; the default returns
    /// `error` unchanged. Returning `Ok` suppresses the failure: the table
    /// is reported as suppressed and its snapshot is left untouched.
    async fn after_alter_error(
        &self,
        _backend: &mut dyn SchemaBackend,
        _ctx: MigrationContext<'_>,
        error: MigrateError,
    ) -> Result<()> {
        Err(error)
    }

    /// Called for every table that was not newly created.
    async fn after_migrate(
        &self,
        _backend: &mut dyn SchemaBackend,
        _ctx: MigrationContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once after the migration transaction committed.
    async fn after_commit(&self, _report: &MigrationReport) -> Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

#[async_trait]
impl MigrationHooks for NoHooks {}
