use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    /// The per-column aggregations emitted for every numeric non-key column.
    pub const NUMERIC: [Aggregation; 4] = [
        Aggregation::Sum,
        Aggregation::Avg,
        Aggregation::Min,
        Aggregation::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Count => "count",
            Aggregation::CountDistinct => "count_distinct",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }

    /// Title-cased kind used in template descriptions (`Sum`, `Avg`, ...).
    pub fn title(&self) -> &'static str {
        match self {
            Aggregation::Count => "Count",
            Aggregation::CountDistinct => "Count Distinct",
            Aggregation::Sum => "Sum",
            Aggregation::Avg => "Avg",
            Aggregation::Min => "Min",
            Aggregation::Max => "Max",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureFormat {
    Number,
    Currency,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(rename = "type")]
    pub aggregation: Aggregation,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<MeasureFormat>,
    /// Source column; absent for `count`.
    #[serde(skip)]
    pub column: Option<String>,
}

impl MeasureDef {
    pub fn count(description: String) -> Self {
        Self {
            name: Aggregation::Count.as_str().to_string(),
            sql: None,
            aggregation: Aggregation::Count,
            description,
            format: None,
            column: None,
        }
    }

    pub fn over_column(
        name: String,
        aggregation: Aggregation,
        column: &str,
        sql: String,
        format: Option<MeasureFormat>,
        description: String,
    ) -> Self {
        Self {
            name,
            sql: Some(sql),
            aggregation,
            description,
            format,
            column: Some(column.to_string()),
        }
    }
}
