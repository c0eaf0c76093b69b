//! Schema snapshot types.
//!
//! A [`SqlModel`] is the last-known shape of one table (or view) and is
//! persisted as JSON. Comparison is structural and case-insensitive on
//! identifiers, and independent of the order columns, indexes and index
//! columns are stored in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::naming::eq_fold;

/// A column as recorded in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlColumn {
    /// Column name.
    #[serde(rename = "ColName")]
    pub name: String,
    /// SQL type text.
    #[serde(rename = "DataType")]
    pub data_type: String,
    /// Default value text; empty for none.
    #[serde(rename = "DefaultValue", default)]
    pub default_value: String,
    /// `NOT NULL` constraint.
    #[serde(rename = "NotNull", default)]
    pub not_null: bool,
    /// Part of the primary key.
    #[serde(rename = "PrimaryKey", default)]
    pub primary_key: bool,
}

impl PartialEq for SqlColumn {
    fn eq(&self, other: &Self) -> bool {
        eq_fold(&self.name, &other.name)
            && eq_fold(&self.data_type, &other.data_type)
            && self.default_value == other.default_value
            && self.not_null == other.not_null
            && self.primary_key == other.primary_key
    }
}

/// An index as recorded in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlIndex {
    /// Index name, without the table prefix.
    pub name: String,
    /// `UNIQUE` index.
    #[serde(rename = "isUnique", default, skip_serializing_if = "is_false")]
    pub is_unique: bool,
    /// Access method (`btree`, `gin`, ...).
    #[serde(rename = "methodName", default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    /// Indexed columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Trailing options inside the column list (`jsonb_path_ops`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub options: String,
    /// Built `CONCURRENTLY`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub concurrently: bool,
    /// `WITH` clause.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub with: String,
    /// `WHERE` clause of a partial index.
    #[serde(rename = "where", default, skip_serializing_if = "String::is_empty")]
    pub where_clause: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

impl PartialEq for SqlIndex {
    fn eq(&self, other: &Self) -> bool {
        eq_fold(&self.name, &other.name)
            && self.is_unique == other.is_unique
            && eq_fold(&self.method, &other.method)
            && columns_equal(&self.columns, &other.columns)
            && eq_fold(&self.options, &other.options)
            && self.concurrently == other.concurrently
            && eq_fold(&self.with, &other.with)
            && eq_fold(&self.where_clause, &other.where_clause)
    }
}

/// Compares two column lists as sets, ignoring case.
#[must_use]
pub fn columns_equal<A: AsRef<str>, B: AsRef<str>>(left: &[A], right: &[B]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|l| right.iter().any(|r| eq_fold(l.as_ref(), r.as_ref())))
        && right
            .iter()
            .all(|r| left.iter().any(|l| eq_fold(l.as_ref(), r.as_ref())))
}

/// The snapshot unit: one table or view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlModel {
    /// Table name.
    pub table: String,
    /// Columns.
    #[serde(rename = "cols", default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<SqlColumn>,
    /// Indexes.
    #[serde(rename = "idxs", default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<SqlIndex>,
    /// Resolved view query.
    #[serde(rename = "viewQuery", default, skip_serializing_if = "String::is_empty")]
    pub view_query: String,
    /// The model is a view.
    #[serde(rename = "isView", default, skip_serializing_if = "is_false")]
    pub is_view: bool,
    /// The view is materialized.
    #[serde(rename = "isMaterialized", default, skip_serializing_if = "is_false")]
    pub is_materialized: bool,
}

impl SqlModel {
    /// Creates an empty snapshot for a table.
    #[must_use]
    pub fn empty(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Returns whether the snapshot records nothing, meaning the table is new.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.indexes.is_empty()
    }

    /// Sorts columns, indexes and each index's columns by name.
    pub fn normalize(&mut self) {
        self.columns.sort_by(|a, b| a.name.cmp(&b.name));
        self.indexes.sort_by(|a, b| a.name.cmp(&b.name));
        for idx in &mut self.indexes {
            idx.columns.sort();
        }
    }

    /// Returns a normalized copy.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Finds a column by name, ignoring case.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&SqlColumn> {
        self.columns.iter().find(|c| eq_fold(&c.name, name))
    }

    /// Finds an index by name, ignoring case.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&SqlIndex> {
        self.indexes.iter().find(|i| eq_fold(&i.name, name))
    }

    /// Returns the primary-key column names, sorted.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        let mut pks: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        pks.sort_unstable();
        pks
    }

    /// Maps the lowercased physical index name (`table` + `name`) to each index.
    #[must_use]
    pub fn indexes_by_physical_name(&self) -> HashMap<String, &SqlIndex> {
        self.indexes
            .iter()
            .map(|idx| (physical_index_name(&self.table, &idx.name), idx))
            .collect()
    }

    /// Serializes the snapshot to JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a snapshot from JSON and normalizes it.
    ///
    /// # Errors
    ///
    /// Returns the parser error.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }
}

impl PartialEq for SqlModel {
    fn eq(&self, other: &Self) -> bool {
        if self.columns.len() != other.columns.len() || self.indexes.len() != other.indexes.len() {
            return false;
        }
        eq_fold(&self.table, &other.table)
            && self.view_query == other.view_query
            && self.is_view == other.is_view
            && self.is_materialized == other.is_materialized
            && self
                .columns
                .iter()
                .all(|c| other.column(&c.name).is_some_and(|o| c == o))
            && self
                .indexes
                .iter()
                .all(|i| other.index(&i.name).is_some_and(|o| i == o))
    }
}

/// Physical index name as created in the database, lowercased.
#[must_use]
pub fn physical_index_name(table: &str, index: &str) -> String {
    format!("{table}{index}").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str) -> SqlColumn {
        SqlColumn {
            name: name.to_string(),
            data_type: ty.to_string(),
            ..SqlColumn::default()
        }
    }

    fn idx(name: &str, columns: &[&str]) -> SqlIndex {
        SqlIndex {
            name: name.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            ..SqlIndex::default()
        }
    }

    fn model(columns: Vec<SqlColumn>, indexes: Vec<SqlIndex>) -> SqlModel {
        SqlModel {
            table: "items".to_string(),
            columns,
            indexes,
            ..SqlModel::default()
        }
    }

    // =========================================================================
    // Equality
    // =========================================================================

    #[test]
    fn test_column_equality_ignores_case_of_identifiers() {
        assert_eq!(col("Name", "varchar(20)"), col("name", "VARCHAR(20)"));

        let mut other = col("name", "VARCHAR(20)");
        other.default_value = "'x'".to_string();
        assert_ne!(col("name", "VARCHAR(20)"), other);
    }

    #[test]
    fn test_index_column_order_is_irrelevant() {
        assert_eq!(idx("ab", &["a", "b"]), idx("AB", &["B", "a"]));
        assert_ne!(idx("ab", &["a", "b"]), idx("ab", &["a"]));

        let mut unique = idx("ab", &["a", "b"]);
        unique.is_unique = true;
        assert_ne!(idx("ab", &["a", "b"]), unique);
    }

    #[test]
    fn test_repeated_columns_do_not_match_distinct_ones() {
        assert!(!columns_equal(&["a", "a"], &["a", "b"]));
        assert!(!columns_equal(&["a", "b"], &["A", "A"]));
        assert!(columns_equal(&["a", "b"], &["B", "A"]));
        assert_ne!(idx("ab", &["a", "a"]), idx("ab", &["a", "b"]));
    }

    #[test]
    fn test_model_equality_is_order_independent() {
        let a = model(
            vec![col("a", "INT"), col("b", "INT")],
            vec![idx("x", &["a", "b"]), idx("y", &["b"])],
        );
        let b = model(
            vec![col("b", "INT"), col("a", "INT")],
            vec![idx("y", &["b"]), idx("x", &["b", "a"])],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_model_equality_checks_sizes_and_members() {
        let a = model(vec![col("a", "INT")], vec![]);
        let b = model(vec![col("a", "INT"), col("b", "INT")], vec![]);
        assert_ne!(a, b);

        let c = model(vec![col("c", "INT")], vec![]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_view_attributes_participate_in_equality() {
        let mut a = model(vec![col("a", "INT")], vec![]);
        let b = a.clone();
        a.is_view = true;
        a.view_query = "SELECT a FROM t".to_string();
        assert_ne!(a, b);
    }

    // =========================================================================
    // Normalization and JSON
    // =========================================================================

    #[test]
    fn test_normalize_sorts_everything() {
        let m = model(
            vec![col("b", "INT"), col("a", "INT")],
            vec![idx("z", &["b", "a"]), idx("m", &["c"])],
        )
        .normalized();
        assert_eq!(m.columns[0].name, "a");
        assert_eq!(m.indexes[0].name, "m");
        assert_eq!(m.indexes[1].columns, ["a", "b"]);
    }

    #[test]
    fn test_json_shape() {
        let mut pk = col("id", "UUID");
        pk.not_null = true;
        pk.primary_key = true;
        let mut unique = idx("appidx", &["app_xid"]);
        unique.is_unique = true;
        let m = model(vec![pk], vec![unique]);

        let json = m.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"table":"items","cols":[{"ColName":"id","DataType":"UUID","DefaultValue":"","NotNull":true,"PrimaryKey":true}],"idxs":[{"name":"appidx","isUnique":true,"columns":["app_xid"]}]}"#
        );
        assert_eq!(SqlModel::from_json(&json).unwrap(), m);
    }

    #[test]
    fn test_from_json_tolerates_missing_fields() {
        let m = SqlModel::from_json(r#"{"table":"t"}"#).unwrap();
        assert!(m.is_empty());

        let m = SqlModel::from_json(
            r#"{"table":"v","cols":[{"ColName":"a","DataType":"INT"}],"viewQuery":"SELECT 1","isView":true}"#,
        )
        .unwrap();
        assert!(m.is_view);
        assert!(!m.columns[0].not_null);
    }

    #[test]
    fn test_physical_names_and_primary_key() {
        let mut id = col("id", "UUID");
        id.primary_key = true;
        let m = model(vec![col("b", "INT"), id], vec![idx("ByB", &["b"])]);
        assert_eq!(m.primary_key(), ["id"]);
        assert!(m.indexes_by_physical_name().contains_key("itemsbyb"));
        assert!(m.index("byb").is_some());
        assert!(m.column("ID").is_some());
    }
}
