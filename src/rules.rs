//! Rule tables for the mapping engine.
//!
//! Built once at startup and handed to each stage by reference; nothing here
//! is mutated during a run.

use crate::domain::DomainProfile;
use crate::semantic_model::{DimensionType, MeasureFormat};
use crate::type_mapper::{TypeMapper, TypeOverride};

#[derive(Debug, Clone)]
pub struct FormatRules {
    pub currency_keywords: Vec<String>,
    pub percent_keywords: Vec<String>,
}

impl Default for FormatRules {
    fn default() -> Self {
        Self {
            currency_keywords: ["price", "value", "amount", "payment"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            percent_keywords: ["score", "rate", "percent"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FormatRules {
    /// Currency keywords are checked before percent keywords.
    pub fn format_for(&self, column: &str) -> MeasureFormat {
        let name = column.to_lowercase();
        if self.currency_keywords.iter().any(|k| name.contains(k.as_str())) {
            MeasureFormat::Currency
        } else if self.percent_keywords.iter().any(|k| name.contains(k.as_str())) {
            MeasureFormat::Percent
        } else {
            MeasureFormat::Number
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatch {
    Exact,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTemplate {
    pub name: String,
    /// Appended after the column reference, e.g. `= 'active'`.
    pub condition: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRule {
    pub patterns: Vec<String>,
    pub matching: ColumnMatch,
    pub column_type: DimensionType,
    pub segments: Vec<SegmentTemplate>,
}

impl SegmentRule {
    fn new(
        patterns: &[&str],
        matching: ColumnMatch,
        column_type: DimensionType,
        segments: &[(&str, &str, &str)],
    ) -> Self {
        Self {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            matching,
            column_type,
            segments: segments
                .iter()
                .map(|(name, condition, description)| SegmentTemplate {
                    name: name.to_string(),
                    condition: condition.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    pub fn matches(&self, column: &str, column_type: DimensionType) -> bool {
        if column_type != self.column_type {
            return false;
        }
        let name = column.to_lowercase();
        self.patterns.iter().any(|p| match self.matching {
            ColumnMatch::Exact => name == *p,
            ColumnMatch::Contains => name.contains(p.as_str()),
        })
    }
}

pub fn default_segment_rules() -> Vec<SegmentRule> {
    vec![
        SegmentRule::new(
            &["status", "state"],
            ColumnMatch::Exact,
            DimensionType::String,
            &[
                ("active", "= 'active'", "Active records only"),
                ("inactive", "= 'inactive'", "Inactive records only"),
            ],
        ),
        SegmentRule::new(
            &["is_active", "active", "enabled", "is_enabled"],
            ColumnMatch::Exact,
            DimensionType::Boolean,
            &[
                ("active", "= true", "Active records only"),
                ("inactive", "= false", "Inactive records only"),
            ],
        ),
        SegmentRule::new(
            &["created_at", "updated_at", "timestamp"],
            ColumnMatch::Contains,
            DimensionType::Time,
            &[
                (
                    "recent",
                    ">= CURRENT_DATE - INTERVAL '30 days'",
                    "Records from last 30 days",
                ),
                (
                    "this_year",
                    ">= DATE_TRUNC('year', CURRENT_DATE)",
                    "Records from current year",
                ),
                (
                    "this_month",
                    ">= DATE_TRUNC('month', CURRENT_DATE)",
                    "Records from current month",
                ),
            ],
        ),
        SegmentRule::new(
            &["is_published", "published", "is_visible", "visible"],
            ColumnMatch::Exact,
            DimensionType::Boolean,
            &[("published", "= true", "Published records only")],
        ),
        SegmentRule::new(
            &["is_deleted", "deleted"],
            ColumnMatch::Exact,
            DimensionType::Boolean,
            &[("not_deleted", "= false", "Records that are not deleted")],
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct PreAggregationRules {
    pub granularity: String,
    pub partition_granularity: String,
    pub refresh_every: String,
    pub max_dimensions: usize,
    pub preferred_dimensions: Vec<String>,
}

impl Default for PreAggregationRules {
    fn default() -> Self {
        Self {
            granularity: "day".to_string(),
            partition_granularity: "month".to_string(),
            refresh_every: "1 hour".to_string(),
            max_dimensions: 3,
            preferred_dimensions: ["status", "type", "category", "state"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Every rule table the engine consults.
#[derive(Debug, Clone)]
pub struct GeneratorRules {
    pub type_mapper: TypeMapper,
    pub domain: DomainProfile,
    pub formats: FormatRules,
    pub segments: Vec<SegmentRule>,
    pub pre_aggregations: PreAggregationRules,
}

impl GeneratorRules {
    pub fn new(domain: DomainProfile) -> Self {
        Self {
            type_mapper: TypeMapper::new(),
            domain,
            formats: FormatRules::default(),
            segments: default_segment_rules(),
            pre_aggregations: PreAggregationRules::default(),
        }
    }

    pub fn with_type_overrides(mut self, overrides: &[TypeOverride]) -> Self {
        self.type_mapper = self.type_mapper.with_overrides(overrides);
        self
    }
}

impl Default for GeneratorRules {
    fn default() -> Self {
        Self::new(DomainProfile::generic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("payment_value", MeasureFormat::Currency)]
    #[case("price", MeasureFormat::Currency)]
    #[case("freight_amount", MeasureFormat::Currency)]
    #[case("review_score", MeasureFormat::Percent)]
    #[case("conversion_rate", MeasureFormat::Percent)]
    #[case("discount_percent", MeasureFormat::Percent)]
    #[case("payment_installments", MeasureFormat::Currency)]
    #[case("product_weight_g", MeasureFormat::Number)]
    fn test_format_for(#[case] column: &str, #[case] expected: MeasureFormat) {
        assert_eq!(FormatRules::default().format_for(column), expected);
    }

    #[test]
    fn test_segment_rule_respects_type_and_match_mode() {
        let rules = default_segment_rules();
        assert!(rules[0].matches("status", DimensionType::String));
        assert!(!rules[0].matches("order_status", DimensionType::String));
        assert!(!rules[0].matches("status", DimensionType::Number));
        assert!(rules[2].matches("order_purchase_timestamp", DimensionType::Time));
        assert!(!rules[2].matches("order_purchase_timestamp", DimensionType::String));
    }
}
