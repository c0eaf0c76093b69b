//! # pgshape-core
//!
//! Model descriptors, schema snapshots, schema diffing and query templating
//! for PostgreSQL.
//!
//! This crate provides:
//! - A model declaration builder (also generated by `#[derive(Model)]`) and a
//!   registry of immutable model descriptors
//! - JSON schema snapshots and a differ that turns a snapshot, a desired
//!   shape and the live catalog into an ordered DDL patch plan
//! - A query template engine resolving `&Model`, `:Field` and friends,
//!   followed by list expansion and `?` to `$n` rebinding
//!
//! Nothing here talks to a database; `pgshape-migrate` executes the plans.
//!
//! ## Declaring and querying a model
//!
//! ```rust
//! use pgshape_core::{Field, Model, ModelDef, Store, SqlArg};
//!
//! struct Account;
//!
//! impl Model for Account {
//!     fn model() -> ModelDef {
//!         ModelDef::new("Account")
//!             .field(Field::of::<i64>("ID"))
//!             .field(Field::of::<String>("Email").unique_index("email"))
//!     }
//! }
//!
//! let mut store = Store::new("shop");
//! store.register::<Account>().unwrap();
//!
//! let q = store
//!     .prepare(
//!         "SELECT :Account.* FROM &Account WHERE :ID IN (?)",
//!         vec![SqlArg::list([1, 2, 3])],
//!         None,
//!     )
//!     .unwrap();
//! assert_eq!(q.sql, "SELECT shop.account.* FROM shop.account WHERE id IN ($1,$2,$3)");
//! ```
//!
//! ## Planning a table
//!
//! ```rust
//! use pgshape_core::{Field, Model, ModelDef, Store};
//! use pgshape_core::migrations::plan_create;
//!
//! struct Account;
//!
//! impl Model for Account {
//!     fn model() -> ModelDef {
//!         ModelDef::new("Account").field(Field::of::<i64>("ID"))
//!     }
//! }
//!
//! let mut store = Store::new("shop");
//! let md = store.register::<Account>().unwrap();
//! let plan = plan_create("shop", &store.desired_model(&md).unwrap());
//! assert_eq!(
//!     plan.queries(),
//!     ["CREATE TABLE shop.account (id BIGINT NOT NULL,PRIMARY KEY (id))"]
//! );
//! ```

pub mod error;
pub mod lexer;
pub mod migrations;
pub mod model;
pub mod naming;
pub mod query;
mod store;

pub use error::{Error, Lookup, Result};
pub use migrations::{PatchPlan, SqlColumn, SqlIndex, SqlModel};
pub use model::{
    ElemType, Field, FieldDescription, Kind, Model, ModelDef, ModelDescriptor, ModelRegistry,
    Role, SqlTyped,
};
pub use query::{PreparedQuery, SqlArg, ToSqlArg, Valuer};
pub use store::{ModelSymbols, Store};
