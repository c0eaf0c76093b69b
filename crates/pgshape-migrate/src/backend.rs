//! Storage seam of the migrator.
//!
//! A [`SchemaBackend`] is one open unit of work: everything it executes
//! becomes visible together on [`SchemaBackend::commit`] or is discarded on
//! [`SchemaBackend::rollback`].

use async_trait::async_trait;
use pgshape_core::SqlModel;
use pgshape_core::migrations::{LiveColumn, LiveIndex};

use crate::error::Result;

/// Transactional access to one database for schema migration.
#[async_trait]
pub trait SchemaBackend: Send {
    /// Creates the namespace with its `_config` snapshot table and its
    /// `_migrations` step table, when missing.
    async fn ensure_schema(&mut self, schema: &str) -> Result<()>;

    /// Executes one DDL statement.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Loads the snapshot of `table`; an empty model when none is stored.
    async fn load_snapshot(&mut self, schema: &str, table: &str) -> Result<SqlModel>;

    /// Inserts or replaces the snapshot of `model.table`.
    async fn save_snapshot(&mut self, schema: &str, model: &SqlModel) -> Result<()>;

    /// Lists every stored snapshot, ordered by table name.
    async fn snapshots(&mut self, schema: &str) -> Result<Vec<SqlModel>>;

    /// Reads the catalog columns of a table.
    async fn live_columns(&mut self, schema: &str, table: &str) -> Result<Vec<LiveColumn>>;

    /// Reads the catalog's non-primary-key indexes of a table.
    async fn live_indexes(&mut self, schema: &str, table: &str) -> Result<Vec<LiveIndex>>;

    /// Records a named step as started.
    async fn start_step(&mut self, schema: &str, name: &str) -> Result<()>;

    /// Returns whether a named step is recorded.
    async fn step_started(&mut self, schema: &str, name: &str) -> Result<bool>;

    /// Removes a named step record.
    async fn stop_step(&mut self, schema: &str, name: &str) -> Result<()>;

    /// Makes all work of this unit durable.
    async fn commit(&mut self) -> Result<()>;

    /// Discards all work of this unit.
    async fn rollback(&mut self) -> Result<()>;
}
