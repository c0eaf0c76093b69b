//! In-memory schema backend for migrator tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use pgshape_core::migrations::{LiveColumn, LiveIndex, physical_index_name};
use pgshape_core::SqlModel;
use pgshape_migrate::{MigrateError, Result, SchemaBackend};

/// Database state that survives a unit of work.
#[derive(Debug, Clone, Default)]
struct State {
    snapshots: BTreeMap<String, SqlModel>,
    steps: BTreeSet<String>,
    schemas: BTreeSet<String>,
}

/// Records statements and keeps snapshots in memory.
///
/// The live catalog mirrors the stored snapshots: every snapshot index is a
/// live index under its physical name. Extra live columns and indexes can be
/// seeded to simulate objects created outside the migrator.
#[derive(Debug, Default)]
pub struct FakeBackend {
    committed: State,
    staged: State,
    /// Every statement executed, across all units of work.
    pub executed: Vec<String>,
    /// Statements to fail with a database error.
    pub fail_on: Vec<String>,
    /// Extra live columns by table.
    pub live_columns: HashMap<String, Vec<LiveColumn>>,
    /// Extra live indexes by table.
    pub extra_indexes: HashMap<String, Vec<LiveIndex>>,
    pub commits: usize,
    pub rollbacks: usize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the statements executed since the last call.
    pub fn take_executed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.executed)
    }

    /// Returns a committed snapshot.
    pub fn committed_snapshot(&self, table: &str) -> Option<&SqlModel> {
        self.committed.snapshots.get(table)
    }

    /// Overwrites a committed snapshot.
    pub fn put_snapshot(&mut self, model: SqlModel) {
        self.committed.snapshots.insert(model.table.clone(), model.clone());
        self.staged.snapshots.insert(model.table.clone(), model);
    }

    /// Returns whether a schema was created and committed.
    pub fn has_schema(&self, schema: &str) -> bool {
        self.committed.schemas.contains(schema)
    }
}

#[async_trait]
impl SchemaBackend for FakeBackend {
    async fn ensure_schema(&mut self, schema: &str) -> Result<()> {
        self.staged.schemas.insert(schema.to_string());
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        if self.fail_on.iter().any(|s| s == sql) {
            return Err(MigrateError::Database(sqlx::Error::Protocol(format!(
                "statement failed: {sql}"
            ))));
        }
        self.executed.push(sql.to_string());
        Ok(())
    }

    async fn load_snapshot(&mut self, _schema: &str, table: &str) -> Result<SqlModel> {
        Ok(self
            .staged
            .snapshots
            .get(table)
            .cloned()
            .map_or_else(|| SqlModel::empty(table), SqlModel::normalized))
    }

    async fn save_snapshot(&mut self, _schema: &str, model: &SqlModel) -> Result<()> {
        let json = model.to_json()?;
        self.staged
            .snapshots
            .insert(model.table.clone(), SqlModel::from_json(&json)?);
        Ok(())
    }

    async fn snapshots(&mut self, _schema: &str) -> Result<Vec<SqlModel>> {
        Ok(self.staged.snapshots.values().cloned().collect())
    }

    async fn live_columns(&mut self, _schema: &str, table: &str) -> Result<Vec<LiveColumn>> {
        Ok(self.live_columns.get(table).cloned().unwrap_or_default())
    }

    async fn live_indexes(&mut self, schema: &str, table: &str) -> Result<Vec<LiveIndex>> {
        let mut live: Vec<LiveIndex> = self
            .committed
            .snapshots
            .get(table)
            .filter(|model| !model.is_view || model.is_materialized)
            .map(|model| {
                model
                    .indexes
                    .iter()
                    .map(|index| LiveIndex {
                        name: physical_index_name(table, &index.name),
                        table: format!("{schema}.{table}"),
                        schema: schema.to_string(),
                        columns: index.columns.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        live.extend(self.extra_indexes.get(table).cloned().unwrap_or_default());
        Ok(live)
    }

    async fn start_step(&mut self, _schema: &str, name: &str) -> Result<()> {
        if !self.staged.steps.insert(name.to_string()) {
            return Err(MigrateError::Database(sqlx::Error::Protocol(format!(
                "duplicate step: {name}"
            ))));
        }
        Ok(())
    }

    async fn step_started(&mut self, _schema: &str, name: &str) -> Result<bool> {
        Ok(self.staged.steps.contains(name))
    }

    async fn stop_step(&mut self, _schema: &str, name: &str) -> Result<()> {
        self.staged.steps.remove(name);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.committed = self.staged.clone();
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged = self.committed.clone();
        self.rollbacks += 1;
        Ok(())
    }
}
