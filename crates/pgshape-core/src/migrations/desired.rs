//! Derivation of the desired schema from a model descriptor.

use crate::error::{Error, Result};
use crate::model::{FieldDescription, ModelDescriptor};
use crate::naming::eq_fold;

use super::snapshot::{SqlColumn, SqlIndex, SqlModel};

const INDEX_METHODS: [&str; 6] = ["btree", "hash", "gist", "spgist", "gin", "brin"];

/// Which annotation an index spec came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexGroup {
    Plain,
    Unique,
    Gin,
}

/// Parses an index spec (`name [flags...]`) for one column.
///
/// Plain and unique specs understand `concurrently`, `unique` and access
/// method names; any other word is appended to the options. Every word after
/// the name of a GIN spec is an option.
fn parse_index_spec(spec: &str, column: &str, group: IndexGroup) -> Option<SqlIndex> {
    let mut parts = spec.split(' ').filter(|p| !p.is_empty());
    let name = parts.next()?.to_lowercase();

    let mut index = SqlIndex {
        name,
        is_unique: group == IndexGroup::Unique,
        method: if group == IndexGroup::Gin {
            "gin".to_string()
        } else {
            String::new()
        },
        columns: vec![column.to_string()],
        ..SqlIndex::default()
    };

    let mut options = Vec::new();
    for part in parts {
        let lower = part.to_lowercase();
        match lower.as_str() {
            _ if group == IndexGroup::Gin => options.push(part),
            "concurrently" => index.concurrently = true,
            "unique" => index.is_unique = true,
            m if INDEX_METHODS.contains(&m) => index.method = part.to_string(),
            _ => options.push(part),
        }
    }
    index.options = options.join(" ");
    Some(index)
}

/// Derives the column and the single-column index fragments of one stored field.
///
/// # Errors
///
/// Returns [`Error::SqlTypeUndefined`] when neither the field nor its element
/// type provides an SQL type.
pub fn field_column(model: &str, fd: &FieldDescription) -> Result<(SqlColumn, Vec<SqlIndex>)> {
    let data_type = fd
        .resolved_sql_type()
        .ok_or_else(|| Error::SqlTypeUndefined {
            model: model.to_string(),
            field: fd.name.clone(),
            tag: fd.elem.tag().to_string(),
        })?;

    let not_null = !fd.nullable;
    let default_value = match &fd.default_value {
        Some(v) if !v.is_empty() => v.clone(),
        _ if not_null && !fd.primary_key => fd.elem.sql_default().unwrap_or_default(),
        _ => String::new(),
    };

    let column = SqlColumn {
        name: fd.db_name.clone(),
        data_type,
        default_value,
        not_null,
        primary_key: fd.primary_key,
    };

    let groups = [
        (&fd.indexes, IndexGroup::Plain),
        (&fd.gin_indexes, IndexGroup::Gin),
        (&fd.unique_indexes, IndexGroup::Unique),
    ];
    let indexes = groups
        .into_iter()
        .flat_map(|(specs, group)| specs.iter().map(move |spec| (spec, group)))
        .filter_map(|(spec, group)| parse_index_spec(spec, &fd.db_name, group))
        .collect();

    Ok((column, indexes))
}

/// Derives the desired [`SqlModel`] of a model.
///
/// Fields sharing an index name merge into one multi-column index whose
/// column list is the deduplicated union; the first fragment supplies the
/// index attributes. Columns, indexes and index columns come out sorted.
/// `view_query` is the already-resolved view query, if the model is a view.
///
/// # Errors
///
/// Returns [`Error::SqlTypeUndefined`] for an untyped stored field and
/// [`Error::NoStoredColumns`] when the model stores nothing.
pub fn desired_model(md: &ModelDescriptor, view_query: Option<String>) -> Result<SqlModel> {
    let mut columns = Vec::new();
    let mut indexes: Vec<SqlIndex> = Vec::new();

    for fd in md.stored_fields() {
        let (column, fragments) = field_column(md.type_name(), fd)?;
        columns.push(column);
        for fragment in fragments {
            match indexes.iter_mut().find(|idx| eq_fold(&idx.name, &fragment.name)) {
                Some(existing) => {
                    for col in fragment.columns {
                        if !existing.columns.iter().any(|c| eq_fold(c, &col)) {
                            existing.columns.push(col);
                        }
                    }
                }
                None => indexes.push(fragment),
            }
        }
    }

    if columns.is_empty() {
        return Err(Error::NoStoredColumns(md.type_name().to_string()));
    }

    let is_view = view_query.is_some();
    // Plain views cannot carry indexes.
    if is_view && !md.is_materialized() {
        indexes.clear();
    }
    Ok(SqlModel {
        table: md.table().to_string(),
        columns,
        indexes,
        is_materialized: is_view && md.is_materialized(),
        view_query: view_query.unwrap_or_default(),
        is_view,
    }
    .normalized())
}
