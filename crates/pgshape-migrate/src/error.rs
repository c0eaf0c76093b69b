//! Error types for the migration runtime.

use std::fmt;

/// Step of a table migration in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Creating the namespace and its bookkeeping tables.
    EnsureSchema,
    /// Reading the persisted snapshot.
    LoadSnapshot,
    /// Reading live columns or indexes.
    Introspect,
    /// Creating a new table or view.
    Create,
    /// Altering an existing table or replacing a view.
    Alter,
    /// Persisting the snapshot.
    SaveSnapshot,
    /// Running a migration hook.
    Hook,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnsureSchema => "ensure-schema",
            Self::LoadSnapshot => "load-snapshot",
            Self::Introspect => "introspect",
            Self::Create => "create",
            Self::Alter => "alter",
            Self::SaveSnapshot => "save-snapshot",
            Self::Hook => "hook",
        })
    }
}

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Snapshot or catalog JSON could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model description, diffing or templating failed.
    #[error(transparent)]
    Model(#[from] pgshape_core::Error),

    /// IO error (reading the configuration file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The transaction was already committed or rolled back.
    #[error("No open transaction")]
    NoTransaction,

    /// A hook rejected the migration.
    #[error("Hook failed: {0}")]
    Hook(String),

    /// A failure inside one phase of a table migration.
    #[error("Migration of '{table}' failed during {phase}: {source}")]
    Phase {
        /// Failing phase.
        phase: Phase,
        /// Table being migrated.
        table: String,
        /// Underlying error.
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Wraps an error with the phase and table it occurred in.
    #[must_use]
    pub fn in_phase(self, phase: Phase, table: impl Into<String>) -> Self {
        Self::Phase {
            phase,
            table: table.into(),
            source: Box::new(self),
        }
    }

    /// Returns the phase of the outermost phase wrapper.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Returns whether the primary key of an existing column would change.
    #[must_use]
    pub fn is_primary_key_change(&self) -> bool {
        match self {
            Self::Model(e) => e.is_primary_key_change(),
            Self::Phase { source, .. } => source.is_primary_key_change(),
            _ => false,
        }
    }

    /// Returns whether running the migration again may succeed.
    ///
    /// Primary-key changes need manual remediation and are never retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !self.is_primary_key_change()
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
