//! Model declarations and the immutable descriptors built from them.

use std::collections::HashMap;

use crate::error::{Error, Lookup, Result};
use crate::naming::to_snake_case;

use super::field::{Field, FieldDescription, Role};

/// A storable data shape.
///
/// Implementations are usually generated by `#[derive(Model)]`, but the
/// builder can be written by hand:
///
/// ```
/// use pgshape_core::{Field, Model, ModelDef};
///
/// struct Account;
///
/// impl Model for Account {
///     fn model() -> ModelDef {
///         ModelDef::new("Account")
///             .field(Field::of::<i64>("ID"))
///             .field(Field::of::<String>("Email").unique_index("email"))
///     }
/// }
/// ```
pub trait Model: 'static {
    /// Returns the declaration of this model.
    fn model() -> ModelDef;
}

#[derive(Debug, Clone)]
enum Part {
    Field(Box<Field>),
    Described(Box<FieldDescription>),
    Embedded(ModelDef),
}

/// Declaration of a model: its name, storage name, fields and view attributes.
#[derive(Debug, Clone)]
pub struct ModelDef {
    type_name: String,
    table: Option<String>,
    parts: Vec<Part>,
    view_query: Option<String>,
    materialized: bool,
}

impl ModelDef {
    /// Starts a declaration for the given type name.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: None,
            parts: Vec::new(),
            view_query: None,
            materialized: false,
        }
    }

    /// Sets the storage (table or view) name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.parts.push(Part::Field(Box::new(field)));
        self
    }

    /// Appends a field that already describes itself; it is taken verbatim.
    #[must_use]
    pub fn described(mut self, field: FieldDescription) -> Self {
        self.parts.push(Part::Described(Box::new(field)));
        self
    }

    /// Splices in the fields of a sub-model at this position.
    #[must_use]
    pub fn embed(mut self, sub: Self) -> Self {
        self.parts.push(Part::Embedded(sub));
        self
    }

    /// Declares the model as a view over the given query template.
    #[must_use]
    pub fn view(mut self, query: impl Into<String>) -> Self {
        self.view_query = Some(query.into());
        self
    }

    /// Declares the view as materialized.
    #[must_use]
    pub const fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    /// Returns the declared type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Flattens the declaration into field descriptions, depth-first.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldDescription> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<FieldDescription>) {
        for part in &self.parts {
            match part {
                Part::Field(field) => out.push(field.as_ref().clone().build()),
                Part::Described(fd) => out.push(fd.as_ref().clone()),
                Part::Embedded(sub) => sub.collect_fields(out),
            }
        }
    }
}

/// Immutable, indexed description of a model.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    type_name: String,
    table: String,
    fields: Vec<FieldDescription>,
    by_name: HashMap<String, usize>,
    by_db_name: HashMap<String, usize>,
    by_json_name: HashMap<String, usize>,
    roles: HashMap<Role, usize>,
    view_query: Option<String>,
    materialized: bool,
}

impl ModelDescriptor {
    /// Builds a descriptor, validating name uniqueness.
    ///
    /// # Errors
    ///
    /// Fails when the model has no type name, when two fields share a
    /// declared or database name, or when more than one field is part of
    /// the primary key.
    pub fn from_def(def: &ModelDef) -> Result<Self> {
        if def.type_name.is_empty() {
            return Err(Error::UnnamedModel);
        }
        let fields = def.fields();

        let duplicate = |column: &str| Error::DuplicateColumn {
            model: def.type_name.clone(),
            column: column.to_string(),
        };

        let mut by_name = HashMap::with_capacity(fields.len());
        let mut by_db_name = HashMap::with_capacity(fields.len());
        let mut by_json_name = HashMap::with_capacity(fields.len());
        let mut roles = HashMap::new();
        let mut primary_key: Option<&str> = None;

        for (i, fd) in fields.iter().enumerate() {
            if by_name.insert(fd.name.clone(), i).is_some() {
                return Err(duplicate(&fd.name));
            }
            if fd.is_stored() && by_db_name.insert(fd.db_name.clone(), i).is_some() {
                return Err(duplicate(&fd.db_name));
            }
            by_json_name.entry(fd.json_name.clone()).or_insert(i);
            if let Some(role) = fd.role {
                roles.entry(role).or_insert(i);
            }
            if fd.primary_key && fd.is_stored() {
                if let Some(first) = primary_key {
                    return Err(Error::MultiplePrimaryKeys {
                        model: def.type_name.clone(),
                        first: first.to_string(),
                        second: fd.name.clone(),
                    });
                }
                primary_key = Some(&fd.name);
            }
        }

        let view_query = def.view_query.clone().filter(|q| !q.is_empty());
        let materialized = def.materialized && view_query.is_some();

        tracing::debug!(
            model = %def.type_name,
            fields = fields.len(),
            view = view_query.is_some(),
            "Built model descriptor"
        );

        Ok(Self {
            table: def
                .table
                .clone()
                .unwrap_or_else(|| to_snake_case(&def.type_name)),
            type_name: def.type_name.clone(),
            fields,
            by_name,
            by_db_name,
            by_json_name,
            roles,
            view_query,
            materialized,
        })
    }

    /// Returns the declared type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the storage name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns all fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }

    /// Returns the stored fields in declaration order.
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldDescription> {
        self.fields.iter().filter(|fd| fd.is_stored())
    }

    fn lookup(
        &self,
        index: &HashMap<String, usize>,
        lookup: Lookup,
        name: &str,
    ) -> Result<&FieldDescription> {
        index
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| Error::NotFound {
                model: self.type_name.clone(),
                lookup,
                name: name.to_string(),
            })
    }

    /// Looks a field up by its declared name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] on a miss.
    pub fn field(&self, name: &str) -> Result<&FieldDescription> {
        self.lookup(&self.by_name, Lookup::Field, name)
    }

    /// Looks a field up by its column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] on a miss.
    pub fn field_by_db_name(&self, db_name: &str) -> Result<&FieldDescription> {
        self.lookup(&self.by_db_name, Lookup::Column, db_name)
    }

    /// Looks a field up by its JSON name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] on a miss.
    pub fn field_by_json_name(&self, json_name: &str) -> Result<&FieldDescription> {
        self.lookup(&self.by_json_name, Lookup::Json, json_name)
    }

    /// Returns the field carrying a role.
    #[must_use]
    pub fn role_field(&self, role: Role) -> Option<&FieldDescription> {
        self.roles.get(&role).map(|&i| &self.fields[i])
    }

    /// Returns the id field.
    #[must_use]
    pub fn id_field(&self) -> Option<&FieldDescription> {
        self.role_field(Role::Id)
    }

    /// Returns the view query template, if the model is a view.
    #[must_use]
    pub fn view_query(&self) -> Option<&str> {
        self.view_query.as_deref()
    }

    /// Returns whether the model is a view.
    #[must_use]
    pub const fn is_view(&self) -> bool {
        self.view_query.is_some()
    }

    /// Returns whether the model is a materialized view.
    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        self.materialized
    }
}
