pub mod measure;
pub mod view;

pub use measure::{Aggregation, MeasureDef, MeasureFormat};
pub use view::{Includes, ViewCube, ViewModel};

use crate::schema::{DomainTag, TableClassification};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    String,
    Number,
    Time,
    Boolean,
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionType::String => write!(f, "string"),
            DimensionType::Number => write!(f, "number"),
            DimensionType::Time => write!(f, "time"),
            DimensionType::Boolean => write!(f, "boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Granularity {
    pub name: String,
    pub interval: String,
}

/// The fixed granularity set attached to every time dimension, in order.
pub fn time_granularities() -> Vec<Granularity> {
    ["hour", "day", "week", "month", "quarter", "year"]
        .iter()
        .map(|unit| Granularity {
            name: unit.to_string(),
            interval: format!("1 {}", unit),
        })
        .collect()
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionDef {
    pub name: String,
    pub sql: String,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub granularities: Vec<Granularity>,
    #[serde(skip)]
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentDef {
    pub name: String,
    pub sql: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    ManyToOne,
    OneToMany,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::ManyToOne => write!(f, "many_to_one"),
            Relationship::OneToMany => write!(f, "one_to_many"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinDef {
    pub name: String,
    pub relationship: Relationship,
    pub sql: String,
    #[serde(skip)]
    pub source_table: String,
    #[serde(skip)]
    pub target_table: String,
    /// Resolved name of the cube the join points at.
    #[serde(skip)]
    pub target_cube: String,
    /// Equality pairs `(source column, target column)`.
    #[serde(skip)]
    pub on: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshKey {
    pub every: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlExpr {
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreAggregationDef {
    pub name: String,
    pub measures: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
    pub time_dimension: String,
    pub granularity: String,
    pub partition_granularity: String,
    pub refresh_key: RefreshKey,
    pub build_range_start: SqlExpr,
    pub build_range_end: SqlExpr,
}

/// One table's analytical model; serialized to one cube file.
///
/// Field order is the output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CubeModel {
    pub name: String,
    pub sql_table: String,
    pub description: String,
    pub measures: Vec<MeasureDef>,
    pub dimensions: Vec<DimensionDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pre_aggregations: Vec<PreAggregationDef>,
    #[serde(skip)]
    pub table: String,
    #[serde(skip)]
    pub classification: TableClassification,
    #[serde(skip)]
    pub domain: DomainTag,
}

impl CubeModel {
    pub fn measure(&self, name: &str) -> Option<&MeasureDef> {
        self.measures.iter().find(|m| m.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionDef> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.measures
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.dimensions.iter().map(|d| d.name.as_str()))
    }

    /// Structural checks the downstream engine would reject.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !is_valid_member_name(&self.name) {
            problems.push(format!(
                "cube name '{}' should start with a lowercase letter and contain only [a-z0-9_]",
                self.name
            ));
        }

        let mut seen = BTreeSet::new();
        for name in self.member_names() {
            if !seen.insert(name) {
                problems.push(format!("duplicate member '{}' in cube '{}'", name, self.name));
            }
            if !is_valid_member_name(name) {
                problems.push(format!("invalid member name '{}' in cube '{}'", name, self.name));
            }
        }

        let mut join_names = BTreeSet::new();
        for join in &self.joins {
            if !join_names.insert(join.name.as_str()) {
                problems.push(format!("duplicate join '{}' in cube '{}'", join.name, self.name));
            }
        }

        problems
    }
}

pub fn is_valid_member_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Top-level document of a cube file.
#[derive(Debug, Serialize)]
pub struct CubeDocument<'a> {
    pub cubes: Vec<&'a CubeModel>,
}

/// Top-level document of a view file.
#[derive(Debug, Serialize)]
pub struct ViewDocument<'a> {
    pub views: Vec<&'a ViewModel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_time_granularities_are_fixed() {
        let names: Vec<_> = time_granularities().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["hour", "day", "week", "month", "quarter", "year"]);
        assert_eq!(time_granularities()[4].interval, "1 quarter");
    }

    #[rstest]
    #[case::simple("orders", true)]
    #[case::with_digits("address_line2", true)]
    #[case::leading_digit("2fa_codes", false)]
    #[case::uppercase("Orders", false)]
    #[case::dash("order-items", false)]
    #[case::empty("", false)]
    fn test_member_name_pattern(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_member_name(name), valid);
    }

    #[test]
    fn test_validate_reports_duplicate_members() {
        let cube = CubeModel {
            name: "orders".to_string(),
            sql_table: "public.orders".to_string(),
            description: String::new(),
            measures: vec![MeasureDef::count(String::new())],
            dimensions: vec![DimensionDef {
                name: "count".to_string(),
                sql: "{CUBE}.count".to_string(),
                dimension_type: DimensionType::Number,
                description: String::new(),
                primary_key: false,
                granularities: vec![],
                column: "count".to_string(),
            }],
            segments: vec![],
            joins: vec![],
            pre_aggregations: vec![],
            table: "orders".to_string(),
            classification: TableClassification::Fact,
            domain: DomainTag::Generic,
        };
        let problems = cube.validate();
        assert_eq!(problems, vec!["duplicate member 'count' in cube 'orders'"]);
    }
}
