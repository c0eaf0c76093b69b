//! Schema differ.
//!
//! Compares the desired [`SqlModel`] of a table against its last snapshot
//! and the live catalog, and produces the [`PatchPlan`] that brings the
//! database in line. Columns and indexes found only in the live catalog are
//! treated as already existing, so a pre-existing table is adopted rather
//! than recreated.

use std::collections::HashSet;

use crate::error::{Error, Result};

use super::introspect::{LiveColumn, LiveIndex, find_live_column, find_live_index, indexes_match_live};
use super::patch::{Patch, PatchPlan};
use super::snapshot::{SqlColumn, SqlModel, physical_index_name};

// ================================================================
// New tables and views
// ================================================================

/// Plans the creation of a table or view that has no snapshot yet.
///
/// Tables get one `CREATE TABLE` followed by their indexes; views get one
/// `CREATE VIEW`, followed by their indexes when materialized.
#[must_use]
pub fn plan_create(schema: &str, desired: &SqlModel) -> PatchPlan {
    let mut plan = PatchPlan::new(schema, &desired.table);
    if desired.is_view {
        push_view(&mut plan, desired);
        return plan;
    }
    plan.push(Patch::CreateTable {
        schema: schema.to_string(),
        table: desired.table.clone(),
        columns: desired.columns.clone(),
    });
    for index in &desired.indexes {
        plan.create_index(index.clone());
    }
    plan
}

fn push_view(plan: &mut PatchPlan, desired: &SqlModel) {
    plan.push(Patch::CreateView {
        schema: plan.schema().to_string(),
        table: desired.table.clone(),
        query: desired.view_query.clone(),
        materialized: desired.is_materialized,
    });
    if desired.is_materialized {
        for index in &desired.indexes {
            plan.create_index(index.clone());
        }
    }
}

// ================================================================
// Change detection
// ================================================================

/// Returns whether nothing needs to change: the snapshot equals the desired
/// model and the live indexes are exactly the declared ones.
#[must_use]
pub fn is_up_to_date(last: &SqlModel, desired: &SqlModel, live_indexes: &[LiveIndex]) -> bool {
    last == desired && indexes_match_live(desired, live_indexes)
}

/// Plans the changes from `last` (the snapshot) to `desired`.
///
/// Views are replaced as a whole. For tables, columns are matched against
/// the snapshot first and the live catalog second; indexes are dropped and
/// recreated rather than altered, and live indexes no longer declared are
/// dropped unconditionally.
///
/// # Errors
///
/// Returns [`Error::PrimaryKeyChange`] when an existing column would enter
/// or leave the primary key.
pub fn plan_alter(
    schema: &str,
    last: &SqlModel,
    desired: &SqlModel,
    live_columns: &[LiveColumn],
    live_indexes: &[LiveIndex],
) -> Result<PatchPlan> {
    if desired.is_view || last.is_view {
        return Ok(plan_view_replace(schema, last, desired));
    }

    let mut plan = PatchPlan::new(schema, &desired.table);
    for column in &desired.columns {
        diff_column(&mut plan, last, column, live_columns)?;
    }
    diff_indexes(&mut plan, last, desired, live_indexes);
    Ok(plan)
}

/// Plans dropping a changed view (and its indexes) and creating it again.
///
/// A table that turned into a view is left in place; only views are dropped.
#[must_use]
pub fn plan_view_replace(schema: &str, last: &SqlModel, desired: &SqlModel) -> PatchPlan {
    let mut plan = PatchPlan::new(schema, &desired.table);
    if last.is_view {
        if last.is_materialized {
            for index in &last.indexes {
                plan.drop_index(index.name.clone());
            }
        }
        plan.push(Patch::DropView {
            schema: schema.to_string(),
            table: last.table.clone(),
            materialized: last.is_materialized,
        });
    }
    if desired.is_view {
        push_view(&mut plan, desired);
    } else {
        plan.push(Patch::CreateTable {
            schema: schema.to_string(),
            table: desired.table.clone(),
            columns: desired.columns.clone(),
        });
        for index in &desired.indexes {
            plan.create_index(index.clone());
        }
    }
    plan
}

// ================================================================
// Columns
// ================================================================

fn diff_column(
    plan: &mut PatchPlan,
    last: &SqlModel,
    column: &SqlColumn,
    live_columns: &[LiveColumn],
) -> Result<()> {
    let old = match last.column(&column.name) {
        Some(old) => old.clone(),
        None => match find_live_column(live_columns, &column.name) {
            Some(live) => {
                tracing::debug!(
                    table = %last.table,
                    column = %live.name,
                    data_type = %live.data_type(),
                    "Column found in catalog only"
                );
                live.as_column(column)
            }
            None => {
                plan.push(Patch::AddColumn(column.clone()));
                return Ok(());
            }
        },
    };

    if column.primary_key != old.primary_key {
        return Err(Error::PrimaryKeyChange {
            table: plan.table().to_string(),
            column: column.name.clone(),
        });
    }

    if column.not_null && !old.not_null && !column.default_value.is_empty() {
        plan.push(Patch::UpdateNulls {
            schema: plan.schema().to_string(),
            table: plan.table().to_string(),
            column: column.clone(),
        });
    }
    if !column.data_type.eq_ignore_ascii_case(&old.data_type) {
        plan.push(Patch::AlterColumnType(column.clone()));
    }
    if column.not_null != old.not_null {
        plan.push(Patch::AlterColumnNullable(column.clone()));
    }
    if column.default_value != old.default_value {
        plan.push(Patch::AlterColumnDefault(column.clone()));
    }
    Ok(())
}

// ================================================================
// Indexes
// ================================================================

fn diff_indexes(
    plan: &mut PatchPlan,
    last: &SqlModel,
    desired: &SqlModel,
    live_indexes: &[LiveIndex],
) {
    let table = desired.table.as_str();
    let mut known = HashSet::with_capacity(desired.indexes.len());

    for index in &desired.indexes {
        let physical = physical_index_name(table, &index.name);
        let live = find_live_index(live_indexes, &physical);
        if live.is_some() {
            known.insert(physical);
        }

        let recreate = match (last.index(&index.name), live) {
            (Some(recorded), Some(live)) => !(index == recorded && live.matches(table, index)),
            (None, Some(_)) => true,
            (_, None) => false,
        };
        if recreate {
            plan.drop_index(index.name.clone());
            plan.create_index(index.clone());
        } else if live.is_none() {
            plan.create_index(index.clone());
        }
    }

    for live in live_indexes {
        if !known.contains(&live.name.to_lowercase()) {
            plan.force_drop_index(live.name.clone());
        }
    }
}
