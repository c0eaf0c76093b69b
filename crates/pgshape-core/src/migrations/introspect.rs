//! Live catalog records.
//!
//! The migration runtime reads these from `information_schema` and
//! `pg_index`; the differ uses them for columns and indexes that exist in the
//! database without being recorded in the snapshot.

use serde::{Deserialize, Serialize};

use crate::naming::eq_fold;

use super::snapshot::{SqlColumn, SqlIndex, SqlModel, columns_equal, physical_index_name};

/// Canonical spelling of the JSON column type.
pub const JSON_TYPE: &str = "jsonb";

/// Catalog description of one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Underlying type name (`udt_name`).
    pub udt_name: String,
    /// `YES` or `NO`.
    pub is_nullable: String,
    /// Character length of sized character types.
    pub char_max_length: Option<i32>,
    /// Numeric precision.
    pub numeric_precision: Option<i32>,
    /// Radix of the numeric precision.
    pub numeric_precision_radix: Option<i32>,
}

impl LiveColumn {
    /// Returns whether the column carries `NOT NULL`.
    #[must_use]
    pub fn not_null(&self) -> bool {
        eq_fold(&self.is_nullable, "NO")
    }

    /// Returns the normalized SQL type text.
    ///
    /// `varchar` with a length becomes `VARCHAR(n)`, `jsonb` becomes the
    /// canonical JSON spelling and `bool` becomes `BOOLEAN`; anything else is
    /// the upper-cased underlying type name.
    #[must_use]
    pub fn data_type(&self) -> String {
        let ty = self.udt_name.to_uppercase();
        match (ty.as_str(), self.char_max_length) {
            ("VARCHAR", Some(len)) => format!("VARCHAR({len})"),
            ("JSONB", _) => JSON_TYPE.to_string(),
            ("BOOL", _) => "BOOLEAN".to_string(),
            _ => ty,
        }
    }

    /// Builds a comparable column record standing in for a missing snapshot entry.
    ///
    /// Default value and primary-key flag are copied from `desired` since the
    /// catalog query does not report them.
    #[must_use]
    pub fn as_column(&self, desired: &SqlColumn) -> SqlColumn {
        SqlColumn {
            name: desired.name.clone(),
            data_type: self.data_type(),
            default_value: desired.default_value.clone(),
            not_null: self.not_null(),
            primary_key: desired.primary_key,
        }
    }
}

/// Catalog description of one non-primary-key index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveIndex {
    /// Physical index name (`table` + declared name).
    pub name: String,
    /// Owning table, as rendered by `regclass`.
    pub table: String,
    /// Schema the index lives in.
    pub schema: String,
    /// Key columns in key order.
    pub columns: Vec<String>,
}

impl LiveIndex {
    /// Returns whether a declared index of `table` matches this one by
    /// physical name and column set.
    #[must_use]
    pub fn matches(&self, table: &str, index: &SqlIndex) -> bool {
        eq_fold(&physical_index_name(table, &index.name), &self.name)
            && columns_equal(&self.columns, &index.columns)
    }
}

impl std::fmt::Display for LiveIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.columns.join(", "))
    }
}

/// Finds a live index by name, ignoring case.
#[must_use]
pub fn find_live_index<'a>(live: &'a [LiveIndex], name: &str) -> Option<&'a LiveIndex> {
    live.iter().find(|idx| eq_fold(&idx.name, name))
}

/// Finds a live column by name, ignoring case.
#[must_use]
pub fn find_live_column<'a>(live: &'a [LiveColumn], name: &str) -> Option<&'a LiveColumn> {
    live.iter().find(|col| eq_fold(&col.name, name))
}

/// Returns whether the live indexes are exactly the model's declared ones.
#[must_use]
pub fn indexes_match_live(model: &SqlModel, live: &[LiveIndex]) -> bool {
    if model.indexes.len() != live.len() {
        return false;
    }
    let declared = model.indexes_by_physical_name();
    live.iter().all(|idx| {
        declared
            .get(&idx.name.to_lowercase())
            .is_some_and(|decl| idx.matches(&model.table, decl))
    })
}
