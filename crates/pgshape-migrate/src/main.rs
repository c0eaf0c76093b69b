//! pgshape-migrate CLI
//!
//! Command-line tool for inspecting snapshot-driven migrations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pgshape_core::query::{count_placeholders, rebind};
use pgshape_migrate::prelude::*;

/// Snapshot-driven PostgreSQL migrations.
#[derive(Parser)]
#[command(name = "pgshape-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Namespace (schema) to work in.
    #[arg(short, long, env = "PGSHAPE_NAMESPACE")]
    namespace: Option<String>,

    /// Pool size.
    #[arg(long)]
    max_connections: Option<u32>,

    /// JSON configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the namespace with its `_config` and `_migrations` tables.
    Init,

    /// Print every stored snapshot as JSON.
    Snapshots,

    /// Print the stored snapshot of one table as JSON.
    Snapshot {
        /// Table name.
        table: String,
    },

    /// Print the live columns and non-primary-key indexes of a table.
    Inspect {
        /// Table name.
        table: String,
    },

    /// Manage named one-off steps.
    Step {
        #[command(subcommand)]
        action: StepAction,
    },

    /// Print a query with `?` placeholders rebound to `$n`.
    Rebind {
        /// Query text.
        query: String,
    },
}

#[derive(Subcommand)]
enum StepAction {
    /// Record a step as started.
    Start {
        /// Step name.
        name: String,
    },
    /// Exit with status 1 unless the step is recorded.
    Check {
        /// Step name.
        name: String,
    },
    /// Remove a step record.
    Stop {
        /// Step name.
        name: String,
    },
}

impl Cli {
    fn config(&self) -> anyhow::Result<MigrateConfig> {
        let mut config = match &self.config {
            Some(path) => MigrateConfig::from_file(path)?,
            None => MigrateConfig::default(),
        };
        if let Some(url) = &self.database_url {
            config.database_url.clone_from(url);
        }
        if let Some(namespace) = &self.namespace {
            config.namespace.clone_from(namespace);
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        if config.database_url.is_empty() {
            anyhow::bail!("no database URL: pass --database-url or set DATABASE_URL");
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    if let Commands::Rebind { query } = &cli.command {
        println!("{}", rebind(query));
        info!(placeholders = count_placeholders(query), "Rebound query");
        return Ok(());
    }

    let config = cli.config()?;
    let schema = config.namespace.clone();
    let pool = config.connect().await?;

    match cli.command {
        Commands::Init => {
            info!(namespace = %schema, "Initializing namespace...");
            StepHistory::new(pool, &schema).ensure_table().await?;
            info!(namespace = %schema, "Bookkeeping tables ready.");
        }

        Commands::Snapshots => {
            let mut backend = PgBackend::begin(&pool).await?;
            let snapshots = backend.snapshots(&schema).await?;
            backend.rollback().await?;

            if snapshots.is_empty() {
                info!(namespace = %schema, "No snapshots stored yet.");
            }
            for snapshot in &snapshots {
                println!("{}", snapshot.to_json()?);
            }
        }

        Commands::Snapshot { table } => {
            let mut backend = PgBackend::begin(&pool).await?;
            let snapshot = backend.load_snapshot(&schema, &table).await?;
            backend.rollback().await?;

            if snapshot.is_empty() {
                anyhow::bail!("no snapshot stored for {schema}.{table}");
            }
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Inspect { table } => {
            let mut backend = PgBackend::begin(&pool).await?;
            let columns = backend.live_columns(&schema, &table).await?;
            let indexes = backend.live_indexes(&schema, &table).await?;
            backend.rollback().await?;

            println!("\nColumns of {schema}.{table}:");
            println!("{:-<60}", "");
            for column in &columns {
                let null = if column.not_null() { "NOT NULL" } else { "NULL" };
                println!(" {:<30} {:<20} {}", column.name, column.data_type(), null);
            }
            println!("\nIndexes:");
            println!("{:-<60}", "");
            for index in &indexes {
                println!(" {index}");
            }
            println!();
        }

        Commands::Step { action } => {
            let steps = StepHistory::new(pool, &schema);
            match action {
                StepAction::Start { name } => steps.start(&name).await?,
                StepAction::Check { name } => {
                    if steps.is_started(&name).await? {
                        println!("{name}: started");
                    } else {
                        println!("{name}: not started");
                        std::process::exit(1);
                    }
                }
                StepAction::Stop { name } => steps.stop(&name).await?,
            }
        }

        Commands::Rebind { .. } => {}
    }

    Ok(())
}
