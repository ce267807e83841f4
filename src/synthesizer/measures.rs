use super::naming::{cube_column, NameRegistry};
use crate::describe::template::{
    column_measure_description, count_description, count_distinct_description,
};
use crate::rules::FormatRules;
use crate::schema::{ColumnInfo, TableInfo};
use crate::semantic_model::{Aggregation, DimensionDef, DimensionType, MeasureDef};

/// `count`, `count_distinct`, then sum/avg/min/max for every numeric
/// non-key column.
///
/// `dimensions` must be the table's dimensions in column order; their
/// resolved types decide which columns are numeric.
pub fn build_measures(
    table: &TableInfo,
    dimensions: &[DimensionDef],
    formats: &FormatRules,
    names: &mut NameRegistry,
) -> Vec<MeasureDef> {
    let mut measures = vec![MeasureDef {
        name: names.claim_measure("count", "count"),
        ..MeasureDef::count(count_description(&table.name))
    }];

    if let Some(key) = distinct_key(table) {
        measures.push(MeasureDef::over_column(
            names.claim_measure("count_distinct", "count_distinct"),
            Aggregation::CountDistinct,
            &key.name,
            cube_column(&key.name),
            None,
            count_distinct_description(&table.name),
        ));
    }

    for (column, dimension) in table.columns.iter().zip(dimensions) {
        if column.is_key() || dimension.dimension_type != DimensionType::Number {
            continue;
        }
        let format = formats.format_for(&column.name);
        for aggregation in Aggregation::NUMERIC {
            let preferred = format!("{}_{}", aggregation, dimension.name);
            measures.push(MeasureDef::over_column(
                names.claim_measure(&preferred, aggregation.as_str()),
                aggregation,
                &column.name,
                cube_column(&column.name),
                Some(format),
                column_measure_description(aggregation, &column.name),
            ));
        }
    }

    measures
}

/// First primary-key column, or the first column of a keyless table.
fn distinct_key(table: &TableInfo) -> Option<&ColumnInfo> {
    table
        .primary_key_columns()
        .next()
        .or_else(|| table.columns.first())
}
