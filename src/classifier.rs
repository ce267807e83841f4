//! Fact / dimension / junction labelling.
//!
//! Best-effort name heuristics; a wrong label only changes descriptions and
//! view membership, never whether a cube can be emitted.

use crate::domain::DomainProfile;
use crate::schema::{DomainTag, TableClassification, TableInfo};
use log::debug;

pub fn classify(table: &TableInfo, domain: &DomainProfile) -> (TableClassification, DomainTag) {
    let tag = if domain.owns(&table.name) {
        domain.tag
    } else {
        DomainTag::Generic
    };

    if is_junction(table) {
        return (TableClassification::Junction, tag);
    }
    if domain.matches_fact(&table.name) {
        return (TableClassification::Fact, tag);
    }
    if domain.matches_dimension(&table.name) {
        return (TableClassification::Dimension, tag);
    }

    debug!(
        "No classification rule matched table {}, defaulting to dimension",
        table.name
    );
    (TableClassification::Dimension, tag)
}

/// At least two foreign keys and nothing but key columns.
fn is_junction(table: &TableInfo) -> bool {
    table.foreign_keys.len() >= 2 && table.columns.iter().all(|c| c.is_key())
}

/// Classifies every table, consuming the introspected set.
pub fn classify_all(tables: Vec<TableInfo>, domain: &DomainProfile) -> Vec<TableInfo> {
    tables
        .into_iter()
        .map(|table| {
            let (classification, tag) = classify(&table, domain);
            debug!("Classified {} as {} ({})", table.name, classification, tag);
            table.classified(classification, tag)
        })
        .collect()
}
