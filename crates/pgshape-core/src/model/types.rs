//! Element types and their PostgreSQL mapping.
//!
//! Every field carries an [`ElemType`]: a type tag plus a primitive [`Kind`].
//! A type may override the SQL type, the default value used for `NOT NULL`
//! columns and its nullability; anything it leaves open falls back to the
//! table keyed by [`Kind`].

/// Primitive kind used as the fallback key for SQL type resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Boolean.
    Bool,
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 8-bit unsigned integer.
    Uint8,
    /// 16-bit unsigned integer.
    Uint16,
    /// 32-bit unsigned integer.
    Uint32,
    /// 64-bit unsigned integer.
    Uint64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Fixed-point decimal, sized by the field's length and precision.
    Decimal,
    /// Character data, sized by the field's length.
    String,
    /// Opaque byte string.
    Bytes,
    /// Structured data stored as JSON.
    Json,
    /// A type with no fallback; it must supply its own SQL type.
    Other,
}

impl Kind {
    /// Returns the fallback SQL type for this kind.
    #[must_use]
    pub fn sql_type(self, len: u32, prec: u32) -> Option<String> {
        let ty = match self {
            Self::Bool => "BOOLEAN",
            Self::Int8 | Self::Int16 | Self::Uint8 => "SMALLINT",
            Self::Int32 | Self::Uint16 => "INT",
            Self::Int64 | Self::Uint32 | Self::Uint64 => "BIGINT",
            Self::Float32 => "FLOAT4",
            Self::Float64 => "FLOAT8",
            Self::Decimal => return Some(format!("NUMERIC({len},{prec})")),
            Self::String => return Some(format!("VARCHAR({len})")),
            Self::Bytes => "BYTEA",
            Self::Json => "jsonb",
            Self::Other => return None,
        };
        Some(ty.to_string())
    }

    /// Returns the fallback default used for `NOT NULL` columns of this kind.
    #[must_use]
    pub const fn default_value(self) -> Option<&'static str> {
        match self {
            Self::Bool => Some("FALSE"),
            Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uint64
            | Self::Float32
            | Self::Float64
            | Self::Decimal => Some("0"),
            Self::String => Some("''"),
            Self::Bytes | Self::Json | Self::Other => None,
        }
    }
}

/// The storage-relevant description of a field's Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElemType {
    tag: String,
    kind: Kind,
    sql_type: Option<String>,
    default_value: Option<String>,
    allow_null: bool,
}

impl ElemType {
    /// Creates an element type resolved purely through its kind.
    #[must_use]
    pub fn of_kind(tag: impl Into<String>, kind: Kind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            sql_type: None,
            default_value: None,
            allow_null: false,
        }
    }

    /// Creates an element type with its own SQL type.
    #[must_use]
    pub fn custom(tag: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            sql_type: Some(sql_type.into()),
            ..Self::of_kind(tag, Kind::Other)
        }
    }

    /// Creates an element type stored as `jsonb`.
    #[must_use]
    pub fn json(tag: impl Into<String>) -> Self {
        Self::of_kind(tag, Kind::Json)
    }

    /// Sets the default value used for `NOT NULL` columns.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Marks the type as accepting NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Returns the type tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the primitive kind.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns whether NULL is allowed by default.
    #[must_use]
    pub const fn allow_null(&self) -> bool {
        self.allow_null
    }

    /// Resolves the SQL type: the type's own override, else the kind fallback.
    #[must_use]
    pub fn sql_type(&self, len: u32, prec: u32) -> Option<String> {
        self.sql_type
            .clone()
            .or_else(|| self.kind.sql_type(len, prec))
    }

    /// Resolves the default for `NOT NULL` columns.
    #[must_use]
    pub fn sql_default(&self) -> Option<String> {
        self.default_value
            .clone()
            .or_else(|| self.kind.default_value().map(str::to_string))
    }
}

/// Types that can back a model field.
pub trait SqlTyped {
    /// Returns the element type description.
    fn elem_type() -> ElemType;
}

macro_rules! impl_sql_typed {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl SqlTyped for $ty {
                fn elem_type() -> ElemType {
                    ElemType::of_kind(stringify!($ty), Kind::$kind)
                }
            }
        )*
    };
}

impl_sql_typed! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    isize => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    usize => Uint64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
}

impl<T: SqlTyped> SqlTyped for Option<T> {
    fn elem_type() -> ElemType {
        T::elem_type().nullable()
    }
}

impl<T: SqlTyped> SqlTyped for Box<T> {
    fn elem_type() -> ElemType {
        T::elem_type()
    }
}
