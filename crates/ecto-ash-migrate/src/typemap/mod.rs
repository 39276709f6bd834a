//! Type mapping from PostgreSQL column types to Ash attribute types.
//!
//! The lookup table is an explicit immutable value. [`TypeMap::builtin`]
//! covers the common PostgreSQL types and [`TypeMap::with_overrides`] layers
//! configured entries on top.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::catalog::{Column, EnumColumn};
use crate::diagnostics::Diagnostic;
use crate::error::{MigrateError, Result};

/// Attribute type tags understood by the generated resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    Integer,
    Uuid,
    String,
    Boolean,
    Decimal,
    Float,
    Date,
    Time,
    NaiveDatetime,
    UtcDatetimeUsec,
    Map,
    Binary,
    /// Closed choice over enum labels.
    Atom,
    Array(Box<TargetType>),
}

impl TargetType {
    fn scalar_name(&self) -> &'static str {
        match self {
            TargetType::Integer => "integer",
            TargetType::Uuid => "uuid",
            TargetType::String => "string",
            TargetType::Boolean => "boolean",
            TargetType::Decimal => "decimal",
            TargetType::Float => "float",
            TargetType::Date => "date",
            TargetType::Time => "time",
            TargetType::NaiveDatetime => "naive_datetime",
            TargetType::UtcDatetimeUsec => "utc_datetime_usec",
            TargetType::Map => "map",
            TargetType::Binary => "binary",
            TargetType::Atom => "atom",
            TargetType::Array(_) => "array",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Array(inner) => write!(f, "{{:array, {}}}", inner),
            other => write!(f, ":{}", other.scalar_name()),
        }
    }
}

impl FromStr for TargetType {
    type Err = MigrateError;

    /// Parse `string`, `:string` or `{:array, :string}`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(inner) = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .and_then(|rest| rest.trim().strip_prefix(":array"))
            .and_then(|rest| rest.trim_start().strip_prefix(','))
        {
            return Ok(TargetType::Array(Box::new(inner.parse()?)));
        }

        let name = s.strip_prefix(':').unwrap_or(s);
        let parsed = match name {
            "integer" => TargetType::Integer,
            "uuid" => TargetType::Uuid,
            "string" => TargetType::String,
            "boolean" => TargetType::Boolean,
            "decimal" => TargetType::Decimal,
            "float" => TargetType::Float,
            "date" => TargetType::Date,
            "time" => TargetType::Time,
            "naive_datetime" => TargetType::NaiveDatetime,
            "utc_datetime_usec" => TargetType::UtcDatetimeUsec,
            "map" => TargetType::Map,
            "binary" => TargetType::Binary,
            "atom" => TargetType::Atom,
            _ => {
                return Err(MigrateError::Config(format!(
                    "unknown target type '{}'",
                    s
                )))
            }
        };
        Ok(parsed)
    }
}

/// Result of mapping one column.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    pub target_type: TargetType,

    /// Set when the column type was not in the table.
    pub diagnostic: Option<Diagnostic>,
}

impl TypeMapping {
    /// A mapping found in the table.
    pub fn lossless(target_type: TargetType) -> Self {
        Self {
            target_type,
            diagnostic: None,
        }
    }

    /// A degraded mapping with a diagnostic.
    pub fn lossy(target_type: TargetType, diagnostic: Diagnostic) -> Self {
        Self {
            target_type,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Native type name → target type lookup.
#[derive(Debug, Clone)]
pub struct TypeMap {
    entries: HashMap<String, TargetType>,
}

impl TypeMap {
    /// Built-in PostgreSQL mappings, keyed by both `data_type` spellings and
    /// underlying type names.
    pub fn builtin() -> Self {
        use TargetType::*;

        let table: &[(&str, TargetType)] = &[
            // Integers
            ("smallint", Integer),
            ("integer", Integer),
            ("bigint", Integer),
            ("int2", Integer),
            ("int4", Integer),
            ("int8", Integer),
            // Exact and approximate numerics
            ("numeric", Decimal),
            ("decimal", Decimal),
            ("money", Decimal),
            ("real", Float),
            ("double precision", Float),
            ("float4", Float),
            ("float8", Float),
            // Text
            ("text", String),
            ("character varying", String),
            ("character", String),
            ("varchar", String),
            ("bpchar", String),
            ("char", String),
            ("name", String),
            ("citext", String),
            // Other scalars
            ("boolean", Boolean),
            ("bool", Boolean),
            ("uuid", Uuid),
            ("date", Date),
            ("time without time zone", Time),
            ("time with time zone", Time),
            ("time", Time),
            ("timetz", Time),
            ("timestamp without time zone", NaiveDatetime),
            ("timestamp", NaiveDatetime),
            ("timestamp with time zone", UtcDatetimeUsec),
            ("timestamptz", UtcDatetimeUsec),
            ("json", Map),
            ("jsonb", Map),
            ("bytea", Binary),
        ];

        Self {
            entries: table
                .iter()
                .map(|(name, tag)| (name.to_string(), tag.clone()))
                .collect(),
        }
    }

    /// Built-in mappings plus configured overrides (type name → tag).
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut map = Self::builtin();
        for (type_name, tag) in overrides {
            map.entries
                .insert(type_name.to_lowercase(), tag.parse()?);
        }
        Ok(map)
    }

    fn lookup(&self, name: &str) -> Option<&TargetType> {
        self.entries.get(&name.to_lowercase())
    }

    /// Map a column. Enum columns always become [`TargetType::Atom`].
    pub fn map(&self, column: &Column, enum_column: Option<&EnumColumn>) -> TypeMapping {
        if enum_column.is_some() {
            return TypeMapping::lossless(TargetType::Atom);
        }

        if let Some(target) = self.lookup(&column.data_type) {
            return TypeMapping::lossless(target.clone());
        }

        if column.data_type.eq_ignore_ascii_case("ARRAY") {
            if let Some(element) = column.udt_name.strip_prefix('_') {
                if let Some(inner) = self.lookup(element) {
                    return TypeMapping::lossless(TargetType::Array(Box::new(inner.clone())));
                }
            }
        } else if let Some(target) = self.lookup(&column.udt_name) {
            return TypeMapping::lossless(target.clone());
        }

        let fallback = if column.data_type.eq_ignore_ascii_case("ARRAY") {
            TargetType::Array(Box::new(TargetType::String))
        } else {
            TargetType::String
        };
        let diagnostic = Diagnostic::UnmappedType {
            column: column.name.clone(),
            native_type: column.data_type.clone(),
            udt_name: column.udt_name.clone(),
            fallback: fallback.to_string(),
        };
        TypeMapping::lossy(fallback, diagnostic)
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::builtin()
    }
}
