//! Named one-off steps.
//!
//! A step is a row in the namespace's `_migrations` table. Data fixes and
//! other one-off jobs record themselves there so they run once per
//! namespace. Inside a migration, hooks use the backend directly; this type
//! runs each call in its own short transaction.

use sqlx::postgres::PgPool;
use tracing::info;

use crate::backend::SchemaBackend;
use crate::error::Result;
use crate::postgres::PgBackend;

/// Step bookkeeping of one namespace.
pub struct StepHistory {
    pool: PgPool,
    schema: String,
}

impl StepHistory {
    /// Creates a step history for `schema`.
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Creates the namespace and its bookkeeping tables when missing.
    pub async fn ensure_table(&self) -> Result<()> {
        let mut backend = PgBackend::begin(&self.pool).await?;
        backend.ensure_schema(&self.schema).await?;
        backend.commit().await
    }

    /// Records a step as started. Fails when it already is.
    pub async fn start(&self, name: &str) -> Result<()> {
        let mut backend = PgBackend::begin(&self.pool).await?;
        backend.start_step(&self.schema, name).await?;
        backend.commit().await?;
        info!(namespace = %self.schema, step = %name, "Step started");
        Ok(())
    }

    /// Returns whether a step is recorded.
    pub async fn is_started(&self, name: &str) -> Result<bool> {
        let mut backend = PgBackend::begin(&self.pool).await?;
        let started = backend.step_started(&self.schema, name).await?;
        backend.rollback().await?;
        Ok(started)
    }

    /// Removes a step record.
    pub async fn stop(&self, name: &str) -> Result<()> {
        let mut backend = PgBackend::begin(&self.pool).await?;
        backend.stop_step(&self.schema, name).await?;
        backend.commit().await?;
        info!(namespace = %self.schema, step = %name, "Step stopped");
        Ok(())
    }
}
