//! Schema snapshots, drift detection and DDL patch generation.
//!
//! The differ is pure: it takes the desired model, the last snapshot and the
//! live catalog records, and returns a [`PatchPlan`]. Reading and writing the
//! database is left to the migration runtime.
//!
//! # Example
//!
//! ```rust
//! use pgshape_core::migrations::{SqlColumn, SqlModel, plan_alter};
//!
//! let id = SqlColumn {
//!     name: "id".into(),
//!     data_type: "UUID".into(),
//!     not_null: true,
//!     primary_key: true,
//!     ..SqlColumn::default()
//! };
//! let last = SqlModel { table: "notes".into(), columns: vec![id.clone()], ..SqlModel::default() };
//!
//! let mut desired = last.clone();
//! desired.columns.push(SqlColumn {
//!     name: "body".into(),
//!     data_type: "TEXT".into(),
//!     ..SqlColumn::default()
//! });
//!
//! let plan = plan_alter("public", &last, &desired, &[], &[]).unwrap();
//! assert_eq!(plan.queries(), ["ALTER TABLE public.notes ADD COLUMN body TEXT"]);
//! ```

mod desired;
mod diff;
mod introspect;
mod patch;
mod snapshot;

pub use desired::{desired_model, field_column};
pub use diff::{is_up_to_date, plan_alter, plan_create, plan_view_replace};
pub use introspect::{
    JSON_TYPE, LiveColumn, LiveIndex, find_live_column, find_live_index, indexes_match_live,
};
pub use patch::{Patch, PatchPlan};
pub use snapshot::{SqlColumn, SqlIndex, SqlModel, columns_equal, physical_index_name};
