//! The storage context: registered models bound to one namespace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::migrations::{self, LiveColumn, SqlModel};
use crate::model::{Model, ModelDescriptor, ModelRegistry};
use crate::query::{self, PreparedQuery, ReplaceSource, ReplaceTable, SqlArg};

/// Models registered for one namespace, with their template symbol tables.
///
/// ```
/// use pgshape_core::{Field, Model, ModelDef, Store};
///
/// struct Account;
///
/// impl Model for Account {
///     fn model() -> ModelDef {
///         ModelDef::new("Account")
///             .field(Field::of::<i64>("ID"))
///             .field(Field::of::<String>("Email"))
///     }
/// }
///
/// let mut store = Store::new("shop");
/// store.register::<Account>().unwrap();
/// assert_eq!(
///     store.resolve("SELECT :Email FROM &Account", None).unwrap(),
///     "SELECT email FROM shop.account"
/// );
/// ```
#[derive(Debug)]
pub struct Store {
    namespace: String,
    strict_templates: bool,
    registry: ModelRegistry,
    models: Vec<Arc<ModelDescriptor>>,
    replacers: HashMap<String, ReplaceTable>,
}

impl Store {
    /// Creates an empty store for a namespace. An empty namespace leaves
    /// table references unqualified.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            strict_templates: false,
            registry: ModelRegistry::new(),
            models: Vec::new(),
            replacers: HashMap::new(),
        }
    }

    /// Makes unresolved template symbols an error.
    #[must_use]
    pub const fn strict_templates(mut self, strict: bool) -> Self {
        self.strict_templates = strict;
        self
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registers a model. Registering the same model twice is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates descriptor construction errors and returns
    /// [`Error::DuplicateModel`] when another type already registered the
    /// same type name.
    pub fn register<M: Model>(&mut self) -> Result<Arc<ModelDescriptor>> {
        let md = self.registry.descriptor::<M>()?;
        if let Some(existing) = self.models.iter().find(|m| m.type_name() == md.type_name()) {
            if Arc::ptr_eq(existing, &md) {
                return Ok(md);
            }
            return Err(Error::DuplicateModel(md.type_name().to_string()));
        }
        tracing::debug!(
            model = %md.type_name(),
            table = %md.table(),
            namespace = %self.namespace,
            "Registered model"
        );
        self.replacers.insert(
            md.type_name().to_string(),
            ReplaceTable::for_model(&md, &self.namespace),
        );
        self.models.push(Arc::clone(&md));
        Ok(md)
    }

    /// Returns the registered models in registration order.
    #[must_use]
    pub fn models(&self) -> &[Arc<ModelDescriptor>] {
        &self.models
    }

    /// Looks a registered model up by type name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotRegistered`] on a miss.
    pub fn model(&self, type_name: &str) -> Result<&Arc<ModelDescriptor>> {
        self.models
            .iter()
            .find(|md| md.type_name() == type_name)
            .ok_or_else(|| Error::ModelNotRegistered(type_name.to_string()))
    }

    /// Resolves the symbols of a query template. `current_schema` defaults
    /// to the store namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedSymbol`] in strict mode.
    pub fn resolve(&self, query: &str, current_schema: Option<&str>) -> Result<String> {
        query::resolve(
            query,
            &self.replacers,
            current_schema.unwrap_or(&self.namespace),
            self.strict_templates,
        )
    }

    /// Resolves, expands and rebinds a query.
    ///
    /// # Errors
    ///
    /// Propagates template and binding errors.
    pub fn prepare(
        &self,
        query: &str,
        args: Vec<SqlArg>,
        current_schema: Option<&str>,
    ) -> Result<PreparedQuery> {
        let resolved = self.resolve(query, current_schema)?;
        PreparedQuery::bind(&resolved, args)
    }

    /// Derives the desired shape of a model, resolving its view query with
    /// the store namespace as the current schema.
    ///
    /// # Errors
    ///
    /// Propagates template and derivation errors.
    pub fn desired_model(&self, md: &ModelDescriptor) -> Result<SqlModel> {
        let view_query = md
            .view_query()
            .map(|q| self.resolve(q, None))
            .transpose()?;
        migrations::desired_model(md, view_query)
    }

    /// Builds the upsert statement of a model, keyed on its id column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoIdField`] when the model has no id field.
    pub fn upsert_sql(&self, md: &ModelDescriptor) -> Result<String> {
        let id = md
            .id_field()
            .ok_or_else(|| Error::NoIdField(md.type_name().to_string()))?;

        let cols: Vec<&str> = md
            .stored_fields()
            .filter(|fd| !fd.skip_upsert)
            .map(|fd| fd.db_name.as_str())
            .collect();
        let fillers = (1..=cols.len())
            .map(|n| format!("${n}"))
            .collect::<Vec<_>>()
            .join(",");

        let updates: Vec<&str> = cols
            .iter()
            .copied()
            .filter(|c| *c != id.db_name)
            .collect();
        let excluded: Vec<String> = updates.iter().map(|c| format!("excluded.{c}")).collect();

        let table = self.qualified(md.table());
        let insert = format!(
            "INSERT INTO {table} ({}) VALUES({fillers}) ON CONFLICT({})",
            cols.join(","),
            id.db_name
        );
        Ok(match updates.len() {
            0 => format!("{insert} DO NOTHING"),
            1 => format!("{insert} DO UPDATE SET {}={}", updates[0], excluded[0]),
            _ => format!(
                "{insert} DO UPDATE SET ({})=({})",
                updates.join(","),
                excluded.join(",")
            ),
        })
    }

    /// Lists every symbol the registered models offer.
    ///
    /// `live` maps table names to their catalog columns; live columns no
    /// field maps to are listed as `-column`.
    #[must_use]
    pub fn symbol_catalog(&self, live: &HashMap<String, Vec<LiveColumn>>) -> Vec<ModelSymbols> {
        let mut out: BTreeMap<String, ModelSymbols> = BTreeMap::new();

        for md in &self.models {
            let Some(table) = self.replacers.replace_table(md.type_name()) else {
                continue;
            };
            let mut symbols: Vec<(String, String)> = table
                .entries()
                .filter(|(symbol, _)| {
                    symbol.starts_with(':') && !symbol.contains(".json.")
                })
                .map(|(symbol, entry)| {
                    let column = entry.to.rsplit('.').next().unwrap_or(&entry.to);
                    (symbol.to_string(), column.to_string())
                })
                .collect();

            for column in live.get(md.table()).into_iter().flatten() {
                if md.field_by_db_name(&column.name).is_err() {
                    symbols.push((format!("-{}", column.name), column.name.clone()));
                }
            }
            symbols.sort();

            out.insert(
                format!("&{}", md.type_name()),
                ModelSymbols {
                    model: md.type_name().to_string(),
                    table: self.qualified(md.table()),
                    symbols,
                },
            );
        }
        out.into_values().collect()
    }

    fn qualified(&self, table: &str) -> String {
        if self.namespace.is_empty() {
            table.to_string()
        } else {
            format!("{}.{table}", self.namespace)
        }
    }
}

/// The template symbols of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSymbols {
    /// Model type name.
    pub model: String,
    /// Qualified table name.
    pub table: String,
    /// `(symbol, column)` pairs sorted by symbol.
    pub symbols: Vec<(String, String)>,
}

impl std::fmt::Display for ModelSymbols {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "&{} -> {}", self.model, self.table)?;
        for (symbol, column) in &self.symbols {
            writeln!(f, "  {symbol} -> {column}")?;
        }
        Ok(())
    }
}
