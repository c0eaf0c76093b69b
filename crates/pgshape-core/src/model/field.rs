//! Per-field storage metadata and the builder that produces it.

use crate::naming::to_snake_case;

use super::types::{ElemType, SqlTyped};

/// Default length for sized types.
pub const DEFAULT_LEN: u32 = 19;

/// Default precision for decimal types.
pub const DEFAULT_PREC: u32 = 6;

/// Lifecycle role a field plays in its model, assigned by naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The `ID` field.
    Id,
    /// The `CreatedAt` field.
    CreatedAt,
    /// The `UpdatedAt` field.
    UpdatedAt,
    /// The `DeletedAt` field.
    DeletedAt,
}

impl Role {
    /// Returns the role conventionally carried by a declared field name.
    #[must_use]
    pub fn for_name(name: &str) -> Option<Self> {
        match name {
            "ID" => Some(Self::Id),
            "CreatedAt" => Some(Self::CreatedAt),
            "UpdatedAt" => Some(Self::UpdatedAt),
            "DeletedAt" => Some(Self::DeletedAt),
            _ => None,
        }
    }
}

/// Normalized description of one model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    /// Declared (logical) name, used in query templates.
    pub name: String,
    /// Database column name; empty when the field is not stored.
    pub db_name: String,
    /// JSON name.
    pub json_name: String,
    /// Element type.
    pub elem: ElemType,
    /// Length for sized types.
    pub len: u32,
    /// Precision for decimal types.
    pub prec: u32,
    /// Raw SQL type overriding the element type.
    pub sql_type: Option<String>,
    /// Raw default value overriding the type default.
    pub default_value: Option<String>,
    /// Plain index specs (`name [flags...]`).
    pub indexes: Vec<String>,
    /// GIN index specs (`name [options...]`).
    pub gin_indexes: Vec<String>,
    /// Unique index specs (`name [flags...]`).
    pub unique_indexes: Vec<String>,
    /// NULL is allowed.
    pub nullable: bool,
    /// Not stored in the database.
    pub skip: bool,
    /// Left out of upsert statements.
    pub skip_upsert: bool,
    /// Full-text search is enabled.
    pub full_text: bool,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Left out of JSON output.
    pub json_skip: bool,
    /// Omitted from JSON output when empty.
    pub json_omit_empty: bool,
    /// Conventional role.
    pub role: Option<Role>,
}

impl FieldDescription {
    /// Returns whether the field is stored in a column.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        !self.skip
    }

    /// Returns the resolved SQL type, if any.
    #[must_use]
    pub fn resolved_sql_type(&self) -> Option<String> {
        self.sql_type
            .clone()
            .or_else(|| self.elem.sql_type(self.len, self.prec))
    }
}

impl std::fmt::Display for FieldDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.skip {
            return write!(f, "- {} [skip]", self.name);
        }
        let nullable = if self.nullable { "*" } else { "" };
        write!(f, "{nullable}{} (db: {})", self.name, self.db_name)
    }
}

/// Builder for a [`FieldDescription`].
///
/// ```
/// use pgshape_core::Field;
///
/// let fd = Field::of::<String>("AppXID")
///     .len(20)
///     .unique_index("appidx")
///     .index("traceappidx")
///     .build();
/// assert_eq!(fd.db_name, "app_xid");
/// assert!(!fd.primary_key);
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    elem: ElemType,
    db_name: Option<String>,
    json_name: Option<String>,
    len: u32,
    prec: u32,
    sql_type: Option<String>,
    default_value: Option<String>,
    indexes: Vec<String>,
    gin_indexes: Vec<String>,
    unique_indexes: Vec<String>,
    nullable: Option<bool>,
    primary_key: Option<bool>,
    skip: bool,
    skip_upsert: bool,
    full_text: bool,
    json_skip: bool,
    json_omit_empty: bool,
}

impl Field {
    /// Starts a field with an explicit element type.
    #[must_use]
    pub fn new(name: impl Into<String>, elem: ElemType) -> Self {
        Self {
            name: name.into(),
            elem,
            db_name: None,
            json_name: None,
            len: DEFAULT_LEN,
            prec: DEFAULT_PREC,
            sql_type: None,
            default_value: None,
            indexes: Vec::new(),
            gin_indexes: Vec::new(),
            unique_indexes: Vec::new(),
            nullable: None,
            primary_key: None,
            skip: false,
            skip_upsert: false,
            full_text: false,
            json_skip: false,
            json_omit_empty: false,
        }
    }

    /// Starts a field whose element type comes from `T`.
    #[must_use]
    pub fn of<T: SqlTyped>(name: impl Into<String>) -> Self {
        Self::new(name, T::elem_type())
    }

    /// Overrides the column name; `"-"` marks the field as not stored.
    #[must_use]
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    /// Marks the field as not stored.
    #[must_use]
    pub const fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Sets the JSON name.
    #[must_use]
    pub fn json_name(mut self, name: impl Into<String>) -> Self {
        self.json_name = Some(name.into());
        self
    }

    /// Leaves the field out of JSON output.
    #[must_use]
    pub const fn json_skip(mut self) -> Self {
        self.json_skip = true;
        self
    }

    /// Omits the field from JSON output when empty.
    #[must_use]
    pub const fn omit_empty(mut self) -> Self {
        self.json_omit_empty = true;
        self
    }

    /// Sets the length used by sized types.
    #[must_use]
    pub const fn len(mut self, len: u32) -> Self {
        self.len = len;
        self
    }

    /// Sets the precision used by decimal types.
    #[must_use]
    pub const fn prec(mut self, prec: u32) -> Self {
        self.prec = prec;
        self
    }

    /// Overrides the SQL type.
    #[must_use]
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Overrides the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Adds the field to a plain index group (`"name [concurrently] [unique] [method] [options]"`).
    #[must_use]
    pub fn index(mut self, spec: impl Into<String>) -> Self {
        self.indexes.push(spec.into());
        self
    }

    /// Adds the field to a unique index group.
    #[must_use]
    pub fn unique_index(mut self, spec: impl Into<String>) -> Self {
        self.unique_indexes.push(spec.into());
        self
    }

    /// Adds the field to a GIN index group (`"name [options]"`).
    #[must_use]
    pub fn gin_index(mut self, spec: impl Into<String>) -> Self {
        self.gin_indexes.push(spec.into());
        self
    }

    /// Overrides nullability.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Overrides primary-key membership.
    #[must_use]
    pub const fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    /// Enables full-text search for the field.
    #[must_use]
    pub const fn full_text(mut self) -> Self {
        self.full_text = true;
        self
    }

    /// Leaves the field out of upsert statements.
    #[must_use]
    pub const fn skip_upsert(mut self) -> Self {
        self.skip_upsert = true;
        self
    }

    /// Produces the normalized description.
    #[must_use]
    pub fn build(self) -> FieldDescription {
        let (db_name, db_skip) = match self.db_name.as_deref() {
            Some("-") => (String::new(), true),
            Some(name) if !name.is_empty() => (name.to_string(), false),
            _ => (to_snake_case(&self.name), false),
        };
        let skip = self.skip || db_skip;

        let conventional = Role::for_name(&self.name);
        let primary_key = self
            .primary_key
            .unwrap_or(conventional == Some(Role::Id));
        let role = match conventional {
            Some(Role::Id) if !primary_key => None,
            other => other,
        };

        let serial = self
            .sql_type
            .as_deref()
            .or(self.elem.sql_type(self.len, self.prec).as_deref())
            .is_some_and(|ty| ty.eq_ignore_ascii_case("BIGSERIAL"));

        FieldDescription {
            json_name: self.json_name.unwrap_or_else(|| self.name.clone()),
            nullable: self.nullable.unwrap_or_else(|| self.elem.allow_null()),
            skip_upsert: self.skip_upsert || serial,
            name: self.name,
            db_name: if skip { String::new() } else { db_name },
            elem: self.elem,
            len: self.len,
            prec: self.prec,
            sql_type: self.sql_type,
            default_value: self.default_value,
            indexes: self.indexes,
            gin_indexes: self.gin_indexes,
            unique_indexes: self.unique_indexes,
            skip,
            full_text: self.full_text,
            primary_key,
            json_skip: self.json_skip,
            json_omit_empty: self.json_omit_empty,
            role,
        }
    }
}
