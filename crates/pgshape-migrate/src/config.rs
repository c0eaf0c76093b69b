//! Runtime configuration.

use std::path::Path;

use pgshape_core::Store;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::Result;
use crate::migrator::Migrator;

/// Connection and migration settings.
///
/// Deserializes from JSON; absent keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Namespace (schema) migrated and queried.
    pub namespace: String,
    /// Pool size.
    pub max_connections: u32,
    /// Render DDL without executing it.
    pub dry_run: bool,
    /// Reject unresolved template symbols.
    pub strict_templates: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            namespace: "public".to_string(),
            max_connections: 5,
            dry_run: false,
            strict_templates: false,
        }
    }
}

impl MigrateConfig {
    /// Creates a configuration with default settings for `database_url`.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Sets the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables strict template resolution.
    #[must_use]
    pub const fn strict_templates(mut self, enabled: bool) -> Self {
        self.strict_templates = enabled;
        self
    }

    /// Creates an empty store for the configured namespace.
    #[must_use]
    pub fn store(&self) -> Store {
        Store::new(self.namespace.clone()).strict_templates(self.strict_templates)
    }

    /// Creates a migrator for `store` with the configured dry-run mode.
    #[must_use]
    pub fn migrator<'s>(&self, store: &'s Store) -> Migrator<'s> {
        Migrator::new(store).dry_run(self.dry_run)
    }

    /// Opens a connection pool.
    pub async fn connect(&self) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;
        Ok(pool)
    }
}
