//! Source column type to dimension type lookup.

pub mod postgres_type;

use crate::semantic_model::DimensionType;
use postgres_type::{normalize_type_name, PostgresType};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown column type '{0}'")]
pub struct UnknownColumnType(pub String);

impl PostgresType {
    pub fn dimension_type(&self) -> DimensionType {
        match self {
            PostgresType::SmallSerial
            | PostgresType::Serial
            | PostgresType::BigSerial
            | PostgresType::SmallInt
            | PostgresType::Integer
            | PostgresType::BigInt
            | PostgresType::Numeric
            | PostgresType::Real
            | PostgresType::DoublePrecision
            | PostgresType::Money
            | PostgresType::Oid => DimensionType::Number,
            PostgresType::Timestamp
            | PostgresType::TimestampTz
            | PostgresType::Date
            | PostgresType::Time
            | PostgresType::TimeTz => DimensionType::Time,
            PostgresType::Boolean => DimensionType::Boolean,
            _ => DimensionType::String,
        }
    }
}

/// Immutable type table, built once and shared by every stage.
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    overrides: BTreeMap<String, DimensionType>,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an extra (normalized) type name, e.g. a domain enum.
    pub fn with_override(mut self, source_type: &str, dimension_type: DimensionType) -> Self {
        self.overrides
            .insert(normalize_type_name(source_type), dimension_type);
        self
    }

    pub fn map(&self, source_type: &str) -> Result<DimensionType, UnknownColumnType> {
        if let Some(mapped) = self.overrides.get(&normalize_type_name(source_type)) {
            return Ok(*mapped);
        }
        PostgresType::from_str(source_type)
            .map(|pg_type| pg_type.dimension_type())
            .map_err(|_| UnknownColumnType(source_type.to_string()))
    }

    /// Unknown types fall back to `string`.
    pub fn map_or_string(&self, source_type: &str) -> DimensionType {
        self.map(source_type).unwrap_or(DimensionType::String)
    }

    pub fn is_numeric(&self, source_type: &str) -> bool {
        self.map_or_string(source_type) == DimensionType::Number
    }

    pub fn with_overrides<'a>(
        self,
        overrides: impl IntoIterator<Item = &'a TypeOverride>,
    ) -> Self {
        overrides.into_iter().fold(self, |mapper, o| {
            mapper.with_override(&o.source_type, o.dimension_type)
        })
    }
}

impl FromStr for DimensionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(DimensionType::String),
            "number" => Ok(DimensionType::Number),
            "time" => Ok(DimensionType::Time),
            "boolean" => Ok(DimensionType::Boolean),
            other => Err(format!(
                "unknown dimension type '{}', expected one of: string, number, time, boolean",
                other
            )),
        }
    }
}

/// A user mapping such as `mood_enum=string`, for types the built-in table
/// does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOverride {
    pub source_type: String,
    pub dimension_type: DimensionType,
}

impl FromStr for TypeOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source_type, dimension_type) = s
            .split_once('=')
            .ok_or_else(|| format!("expected TYPE=DIMENSION, got '{}'", s))?;
        if source_type.trim().is_empty() {
            return Err(format!("missing source type in '{}'", s));
        }
        Ok(TypeOverride {
            source_type: source_type.trim().to_string(),
            dimension_type: dimension_type.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("integer", DimensionType::Number)]
    #[case("numeric(12,2)", DimensionType::Number)]
    #[case("money", DimensionType::Number)]
    #[case("character varying", DimensionType::String)]
    #[case("uuid", DimensionType::String)]
    #[case("jsonb", DimensionType::String)]
    #[case("interval", DimensionType::String)]
    #[case("timestamp without time zone", DimensionType::Time)]
    #[case("date", DimensionType::Time)]
    #[case("boolean", DimensionType::Boolean)]
    fn test_map(#[case] source_type: &str, #[case] expected: DimensionType) {
        assert_eq!(TypeMapper::new().map(source_type).unwrap(), expected);
    }

    #[test]
    fn test_unknown_type_is_an_error_but_defaults_to_string() {
        let mapper = TypeMapper::new();
        assert_eq!(
            mapper.map("order_status_enum"),
            Err(UnknownColumnType("order_status_enum".to_string()))
        );
        assert_eq!(mapper.map_or_string("order_status_enum"), DimensionType::String);
    }

    #[test]
    fn test_override_wins() {
        let overrides: Vec<TypeOverride> = vec!["Flag_Enum=boolean".parse().unwrap()];
        let mapper = TypeMapper::new().with_overrides(&overrides);
        assert_eq!(mapper.map("flag_enum").unwrap(), DimensionType::Boolean);
        assert!(!mapper.is_numeric("flag_enum"));
        assert_eq!(mapper.map("timestamptz").unwrap(), DimensionType::Time);
    }

    #[rstest]
    #[case::no_separator("mood_enum")]
    #[case::no_type("=string")]
    #[case::bad_dimension("mood_enum=enum")]
    fn test_malformed_override_is_rejected(#[case] raw: &str) {
        assert!(raw.parse::<TypeOverride>().is_err());
    }
}
