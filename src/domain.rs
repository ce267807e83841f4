//! Built-in domain profiles: hand-tuned table-name lists per business domain.

use crate::schema::{DomainTag, TableInfo};
use log::info;
use std::str::FromStr;

const GENERIC_FACT_PATTERNS: &[&str] = &[
    "fact_",
    "sales_",
    "orders_",
    "transactions_",
    "events_",
    "payments_",
    "bookings_",
    "sessions_",
    "activities_",
    "_fact",
    "_sales",
    "_orders",
    "_transactions",
    "_events",
];

const GENERIC_DIMENSION_PATTERNS: &[&str] = &[
    "dim_",
    "customers",
    "products",
    "users",
    "categories",
    "locations",
    "employees",
    "vendors",
    "suppliers",
    "_dim",
    "_master",
    "_ref",
    "_lookup",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainProfile {
    pub tag: DomainTag,
    /// Table names that belong to this domain's fact side.
    pub fact_tables: Vec<String>,
    /// Table names that belong to this domain's dimension side.
    pub dimension_tables: Vec<String>,
    /// Domain-independent name fragments.
    pub fact_patterns: Vec<String>,
    pub dimension_patterns: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl DomainProfile {
    fn with_tables(tag: DomainTag, fact_tables: &[&str], dimension_tables: &[&str]) -> Self {
        Self {
            tag,
            fact_tables: strings(fact_tables),
            dimension_tables: strings(dimension_tables),
            fact_patterns: strings(GENERIC_FACT_PATTERNS),
            dimension_patterns: strings(GENERIC_DIMENSION_PATTERNS),
        }
    }

    pub fn generic() -> Self {
        Self::with_tables(DomainTag::Generic, &[], &[])
    }

    pub fn ecommerce() -> Self {
        Self::with_tables(
            DomainTag::Ecommerce,
            &["orders", "order_items", "payments"],
            &["customers", "products", "categories"],
        )
    }

    pub fn saas() -> Self {
        Self::with_tables(
            DomainTag::Saas,
            &["usage_events", "billing_events", "feature_usage"],
            &["users", "subscriptions", "features"],
        )
    }

    pub fn finance() -> Self {
        Self::with_tables(
            DomainTag::Finance,
            &["transactions", "positions", "trades"],
            &["accounts", "assets", "portfolios"],
        )
    }

    pub fn for_tag(tag: DomainTag) -> Self {
        match tag {
            DomainTag::Ecommerce => Self::ecommerce(),
            DomainTag::Saas => Self::saas(),
            DomainTag::Finance => Self::finance(),
            DomainTag::Generic => Self::generic(),
        }
    }

    pub fn builtin() -> Vec<DomainProfile> {
        vec![Self::ecommerce(), Self::saas(), Self::finance()]
    }

    pub fn matches_fact(&self, table_name: &str) -> bool {
        let name = table_name.to_lowercase();
        contains_any(&name, &self.fact_tables) || contains_any(&name, &self.fact_patterns)
    }

    pub fn matches_dimension(&self, table_name: &str) -> bool {
        let name = table_name.to_lowercase();
        contains_any(&name, &self.dimension_tables)
            || contains_any(&name, &self.dimension_patterns)
    }

    /// Whether the table is one of this profile's own domain tables.
    pub fn owns(&self, table_name: &str) -> bool {
        let name = table_name.to_lowercase();
        contains_any(&name, &self.fact_tables) || contains_any(&name, &self.dimension_tables)
    }
}

impl Default for DomainProfile {
    fn default() -> Self {
        Self::generic()
    }
}

fn contains_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| name.contains(p.as_str()))
}

impl FromStr for DomainTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ecommerce" | "e-commerce" => Ok(DomainTag::Ecommerce),
            "saas" => Ok(DomainTag::Saas),
            "finance" => Ok(DomainTag::Finance),
            "generic" => Ok(DomainTag::Generic),
            other => Err(format!(
                "unknown domain '{}', expected one of: ecommerce, saas, finance, generic",
                other
            )),
        }
    }
}

/// Picks the first built-in profile with at least two of its tables present.
pub fn detect_domain(tables: &[TableInfo]) -> DomainProfile {
    for profile in DomainProfile::builtin() {
        let wanted = profile.fact_tables.iter().chain(profile.dimension_tables.iter());
        let matches = wanted
            .filter(|pattern| {
                tables
                    .iter()
                    .any(|t| t.name.to_lowercase().contains(pattern.as_str()))
            })
            .count();
        if matches >= 2 {
            info!("Detected domain: {}", profile.tag);
            return profile;
        }
    }
    DomainProfile::generic()
}
