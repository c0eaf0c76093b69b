//! Snapshot-driven PostgreSQL migrations for pgshape models.
//!
//! `pgshape-migrate` keeps the tables of a namespace in line with the models
//! registered in a [`pgshape_core::Store`]:
//! - The last applied shape of every table is stored as JSON in the
//!   namespace's `_config` table
//! - Each run compares it with the declared shape and the live catalog, and
//!   executes only the difference
//! - All tables migrate in one transaction; any failure rolls everything back
//! - Primary-key changes are never migrated automatically
//!
//! # Architecture
//!
//! - **Backend** - [`SchemaBackend`], the transactional storage seam, with
//!   [`PgBackend`] over `sqlx`
//! - **Migrator** - [`Migrator`], the per-table create/alter flow
//! - **Hooks** - [`MigrationHooks`], callbacks around each table and the commit
//! - **History** - [`StepHistory`], named one-off steps in `_migrations`
//!
//! # Example
//!
//! ```rust,ignore
//! use pgshape_migrate::prelude::*;
//!
//! let config = MigrateConfig::new("postgres://localhost/app").namespace("shard1");
//! let mut store = config.store();
//! store.register::<Account>()?;
//!
//! let pool = config.connect().await?;
//! let report = Migrator::new(&store).run(&pool).await?;
//! for table in &report.tables {
//!     println!("{}: {:?}", table.table, table.action);
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Create the namespace and its bookkeeping tables
//! pgshape-migrate --namespace shard1 init
//!
//! # Show stored snapshots
//! pgshape-migrate --namespace shard1 snapshots
//!
//! # Show live columns and indexes of a table
//! pgshape-migrate --namespace shard1 inspect accounts
//!
//! # Record a one-off step
//! pgshape-migrate --namespace shard1 step start backfill-emails
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod hooks;
pub mod migrator;
pub mod postgres;

pub use backend::SchemaBackend;
pub use config::MigrateConfig;
pub use error::{MigrateError, Phase, Result};
pub use history::StepHistory;
pub use hooks::{MigrationContext, MigrationHooks, NoHooks};
pub use migrator::{MigrationReport, Migrator, TableAction, TableReport};
pub use postgres::PgBackend;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::SchemaBackend;
    pub use crate::config::MigrateConfig;
    pub use crate::error::{MigrateError, Phase, Result};
    pub use crate::history::StepHistory;
    pub use crate::hooks::{MigrationContext, MigrationHooks, NoHooks};
    pub use crate::migrator::{MigrationReport, Migrator, TableAction, TableReport};
    pub use crate::postgres::PgBackend;
}
