//! Positional query arguments.

use std::fmt;
use std::sync::Arc;

/// A value that converts itself into a bindable argument, the way a driver
/// asks a custom type for its wire value.
///
/// Valuers are resolved before list expansion, so an optional wrapper that
/// resolves to [`SqlArg::Null`] is bound as NULL rather than expanded.
pub trait Valuer: fmt::Debug + Send + Sync {
    /// Returns the underlying argument.
    fn value(&self) -> SqlArg;
}

/// A positional argument of a prepared query.
#[derive(Debug, Clone)]
pub enum SqlArg {
    /// NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
    /// Byte string; always bound as one opaque value.
    Bytes(Vec<u8>),
    /// JSON document.
    Json(serde_json::Value),
    /// Sequence bound to a single placeholder and expanded to one
    /// placeholder per element.
    List(Vec<SqlArg>),
    /// Driver-convertible value, resolved before expansion.
    Valuer(Arc<dyn Valuer>),
}

impl SqlArg {
    /// Builds a list argument.
    #[must_use]
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlArg,
    {
        Self::List(items.into_iter().map(ToSqlArg::to_sql_arg).collect())
    }

    /// Wraps a [`Valuer`].
    #[must_use]
    pub fn valuer(v: impl Valuer + 'static) -> Self {
        Self::Valuer(Arc::new(v))
    }

    /// Resolves valuers, repeatedly if a valuer yields another one.
    #[must_use]
    pub fn resolved(self) -> Self {
        let mut arg = self;
        while let Self::Valuer(v) = arg {
            arg = v.value();
        }
        arg
    }

    /// Returns whether this is a list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl PartialEq for SqlArg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Valuer(a), b) => &a.value() == b,
            (a, Self::Valuer(b)) => a == &b.value(),
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

/// Conversion into a [`SqlArg`].
pub trait ToSqlArg {
    /// Converts the value.
    fn to_sql_arg(self) -> SqlArg;
}

impl ToSqlArg for SqlArg {
    fn to_sql_arg(self) -> SqlArg {
        self
    }
}

macro_rules! impl_to_sql_arg {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl ToSqlArg for $ty {
                fn to_sql_arg(self) -> SqlArg {
                    SqlArg::$variant(self.into())
                }
            }
        )*
    };
}

impl_to_sql_arg!(Bool: bool);
impl_to_sql_arg!(Int: i8, i16, i32, i64, u8, u16, u32);
impl_to_sql_arg!(Float: f32, f64);
impl_to_sql_arg!(Text: String, &str);
impl_to_sql_arg!(Bytes: Vec<u8>, &[u8]);
impl_to_sql_arg!(Json: serde_json::Value);

impl<T: ToSqlArg> ToSqlArg for Option<T> {
    fn to_sql_arg(self) -> SqlArg {
        self.map_or(SqlArg::Null, ToSqlArg::to_sql_arg)
    }
}
