//! Model declarations, field metadata and the descriptor registry.

mod descriptor;
mod field;
mod registry;
mod types;

pub use descriptor::{Model, ModelDef, ModelDescriptor};
pub use field::{DEFAULT_LEN, DEFAULT_PREC, Field, FieldDescription, Role};
pub use registry::ModelRegistry;
pub use types::{ElemType, Kind, SqlTyped};
