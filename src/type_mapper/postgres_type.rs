use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostgresType {
    SmallSerial,
    Serial,
    BigSerial,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    DoublePrecision,
    Money,
    ByteA,
    Varchar,
    Char,
    Text,
    Citext,
    Cidr,
    Inet,
    MacAddr,
    MacAddr8,
    Bit,
    Uuid,
    Xml,
    Json,
    Jsonb,
    TsVector,
    TsQuery,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Interval,
    Point,
    Line,
    LSeg,
    Box,
    Path,
    Polygon,
    Circle,
    Geometry,
    Array,
    Oid,
    PgLsn,
    Boolean,
    Name,
}

/// Lowercases, drops type modifiers such as `(255)` or `(6)` and collapses
/// whitespace, so `TIMESTAMP(3) WITH TIME ZONE` reads as
/// `timestamp with time zone`.
pub fn normalize_type_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.trim().chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.extend(c.to_lowercase()),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl FromStr for PostgresType {
    type Err = String;

    /// Accepts both `information_schema.columns.data_type` spellings and
    /// `udt_name` aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_type_name(s);
        if normalized.ends_with("[]") || (normalized.starts_with('_') && normalized.len() > 1) {
            return Ok(PostgresType::Array);
        }

        match normalized.as_str() {
            "smallserial" | "serial2" => Ok(PostgresType::SmallSerial),
            "serial" | "serial4" => Ok(PostgresType::Serial),
            "bigserial" | "serial8" => Ok(PostgresType::BigSerial),
            "smallint" | "int2" | "tinyint" => Ok(PostgresType::SmallInt),
            "integer" | "int" | "int4" => Ok(PostgresType::Integer),
            "bigint" | "int8" => Ok(PostgresType::BigInt),
            "numeric" | "decimal" => Ok(PostgresType::Numeric),
            "real" | "float4" => Ok(PostgresType::Real),
            "double precision" | "float8" | "float" => Ok(PostgresType::DoublePrecision),
            "money" => Ok(PostgresType::Money),
            "bytea" => Ok(PostgresType::ByteA),
            "character varying" | "varchar" | "nvarchar" => Ok(PostgresType::Varchar),
            "character" | "char" | "bpchar" | "nchar" => Ok(PostgresType::Char),
            "text" => Ok(PostgresType::Text),
            "citext" => Ok(PostgresType::Citext),
            "cidr" => Ok(PostgresType::Cidr),
            "inet" => Ok(PostgresType::Inet),
            "macaddr" => Ok(PostgresType::MacAddr),
            "macaddr8" => Ok(PostgresType::MacAddr8),
            "bit" | "bit varying" | "varbit" => Ok(PostgresType::Bit),
            "uuid" => Ok(PostgresType::Uuid),
            "xml" => Ok(PostgresType::Xml),
            "json" => Ok(PostgresType::Json),
            "jsonb" => Ok(PostgresType::Jsonb),
            "tsvector" => Ok(PostgresType::TsVector),
            "tsquery" => Ok(PostgresType::TsQuery),
            "timestamp" | "timestamp without time zone" | "datetime" => {
                Ok(PostgresType::Timestamp)
            }
            "timestamptz" | "timestamp with time zone" => Ok(PostgresType::TimestampTz),
            "date" => Ok(PostgresType::Date),
            "time" | "time without time zone" => Ok(PostgresType::Time),
            "timetz" | "time with time zone" => Ok(PostgresType::TimeTz),
            "interval" => Ok(PostgresType::Interval),
            "point" => Ok(PostgresType::Point),
            "line" => Ok(PostgresType::Line),
            "lseg" => Ok(PostgresType::LSeg),
            "box" => Ok(PostgresType::Box),
            "path" => Ok(PostgresType::Path),
            "polygon" => Ok(PostgresType::Polygon),
            "circle" => Ok(PostgresType::Circle),
            "geometry" | "geography" => Ok(PostgresType::Geometry),
            "array" => Ok(PostgresType::Array),
            "oid" => Ok(PostgresType::Oid),
            "pg_lsn" => Ok(PostgresType::PgLsn),
            "boolean" | "bool" => Ok(PostgresType::Boolean),
            "name" => Ok(PostgresType::Name),
            _ => Err(format!("Unknown PostgreSQL type: {}", s)),
        }
    }
}
