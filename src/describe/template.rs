//! Deterministic description text built from names alone.

use super::{DescriptionProvider, MemberDescriptions, TableContext};
use crate::schema::TableClassification;
use crate::semantic_model::{Aggregation, CubeModel, MeasureDef};
use crate::synthesizer::naming::humanize;
use async_trait::async_trait;

pub fn cube_description(table: &str, classification: TableClassification) -> String {
    let title = humanize(table);
    match classification {
        TableClassification::Fact => format!("{} transaction and metrics data", title),
        TableClassification::Dimension => format!("{} master data and attributes", title),
        TableClassification::Junction => format!("{} relationship mapping data", title),
    }
}

pub fn dimension_description(column: &str) -> String {
    format!("{} dimension", humanize(column))
}

pub fn count_description(table: &str) -> String {
    format!("Total number of {} records", table)
}

pub fn count_distinct_description(table: &str) -> String {
    format!("Count of unique {} records", table)
}

pub fn column_measure_description(aggregation: Aggregation, column: &str) -> String {
    format!("{} of {}", aggregation.title(), column)
}

pub fn measure_description(measure: &MeasureDef, table: &str) -> String {
    match (measure.aggregation, measure.column.as_deref()) {
        (Aggregation::Count, _) => count_description(table),
        (Aggregation::CountDistinct, _) => count_distinct_description(table),
        (aggregation, Some(column)) => column_measure_description(aggregation, column),
        (aggregation, None) => format!("{} of {} records", aggregation.title(), table),
    }
}

/// Recomputes every description from the cube's own names.
pub fn describe_cube(cube: &CubeModel) -> MemberDescriptions {
    MemberDescriptions {
        cube: Some(cube_description(&cube.table, cube.classification)),
        measures: cube
            .measures
            .iter()
            .map(|m| (m.name.clone(), measure_description(m, &cube.table)))
            .collect(),
        dimensions: cube
            .dimensions
            .iter()
            .map(|d| (d.name.clone(), dimension_description(&d.column)))
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDescriptions;

#[async_trait]
impl DescriptionProvider for TemplateDescriptions {
    async fn describe(&self, _context: &TableContext, cube: &CubeModel) -> MemberDescriptions {
        describe_cube(cube)
    }

    fn name(&self) -> &'static str {
        "template"
    }
}
