//! Error types shared by descriptors, the schema differ and the query pipeline.

/// Which index of a model descriptor a failed lookup went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Lookup by declared field name.
    Field,
    /// Lookup by database column name.
    Column,
    /// Lookup by JSON name.
    Json,
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field => f.write_str("field"),
            Self::Column => f.write_str("column"),
            Self::Json => f.write_str("json field"),
        }
    }
}

/// Errors raised while describing models, diffing schemas or preparing queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Two fields of one model derive the same name.
    #[error("Model '{model}': column name not unique: '{column}'")]
    DuplicateColumn {
        /// Model type name.
        model: String,
        /// The clashing name.
        column: String,
    },

    /// More than one stored field is part of the primary key.
    #[error("Model '{model}': fields '{first}' and '{second}' are both primary keys")]
    MultiplePrimaryKeys {
        /// Model type name.
        model: String,
        /// The first primary-key field.
        first: String,
        /// The second primary-key field.
        second: String,
    },

    /// A model was declared without a type name.
    #[error("Model has no type name")]
    UnnamedModel,

    /// A lookup on a model descriptor missed.
    #[error("Model '{model}': no such {lookup}: '{name}'")]
    NotFound {
        /// Model type name.
        model: String,
        /// Which index was searched.
        lookup: Lookup,
        /// The missing name.
        name: String,
    },

    /// Two distinct models share a type name.
    #[error("Model '{0}' is already registered by another type")]
    DuplicateModel(String),

    /// A model type name is not registered in the store.
    #[error("Model '{0}' is not registered")]
    ModelNotRegistered(String),

    /// No SQL type could be resolved for a stored field.
    #[error("Model '{model}': SQL type not defined for field '{field}' ({tag})")]
    SqlTypeUndefined {
        /// Model type name.
        model: String,
        /// Field name.
        field: String,
        /// Element type tag.
        tag: String,
    },

    /// A model has no stored fields at all.
    #[error("Model '{0}': no stored fields")]
    NoStoredColumns(String),

    /// A model has no field carrying the id role.
    #[error("Model '{0}': no id field")]
    NoIdField(String),

    /// The primary-key flag of an existing column differs from the model.
    #[error("Table '{table}': primary key of column '{column}' cannot be changed")]
    PrimaryKeyChange {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A template symbol did not resolve while strict templates are enabled.
    #[error("Unresolved query symbol '{0}'")]
    UnresolvedSymbol(String),

    /// An empty list was bound to a placeholder.
    #[error("Empty list bound to placeholder {position} in query: {query}")]
    EmptyList {
        /// One-based argument position.
        position: usize,
        /// The offending query.
        query: String,
    },

    /// A `$n` placeholder refers past the argument list.
    #[error("Argument number '${0}' out of range")]
    PlaceholderOutOfRange(usize),

    /// More `?` placeholders than arguments.
    #[error("Number of placeholders exceeds arguments")]
    TooManyPlaceholders,
}

impl Error {
    /// Returns whether this is a primary-key change, which is never migrated automatically.
    #[must_use]
    pub const fn is_primary_key_change(&self) -> bool {
        matches!(self, Self::PrimaryKeyChange { .. })
    }
}

/// Result type for pgshape-core operations.
pub type Result<T> = std::result::Result<T, Error>;
