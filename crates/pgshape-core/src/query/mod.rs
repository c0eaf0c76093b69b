//! Query preparation.
//!
//! A query travels through three stages before it reaches the driver:
//!
//! 1. [`resolve`] substitutes model and field symbols.
//! 2. [`expand`] turns list arguments into one placeholder per element.
//! 3. [`rebind`] numbers the remaining `?` placeholders.
//!
//! [`crate::Store::prepare`] runs all three.

mod expand;
mod rebind;
mod template;
mod value;

pub use expand::expand;
pub use rebind::{count_placeholders, rebind};
pub use template::{ReplaceEntry, ReplaceSource, ReplaceTable, resolve};
pub use value::{SqlArg, ToSqlArg, Valuer};

/// SQL text and arguments ready to hand to a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    /// Query text with `$n` placeholders.
    pub sql: String,
    /// Positional arguments, flattened.
    pub args: Vec<SqlArg>,
}

impl PreparedQuery {
    /// Expands list arguments and rebinds placeholders of an already
    /// resolved query.
    ///
    /// # Errors
    ///
    /// Propagates the binding errors of [`expand`].
    pub fn bind(query: &str, args: Vec<SqlArg>) -> crate::Result<Self> {
        let (expanded, args) = expand(query, args)?;
        Ok(Self {
            sql: rebind(&expanded),
            args,
        })
    }
}
