use crate::rules::PreAggregationRules;
use crate::schema::{TableClassification, TableInfo};
use crate::semantic_model::{
    DimensionDef, DimensionType, PreAggregationDef, RefreshKey, SqlExpr,
};

/// A daily `main_rollup` over `count` for fact tables that have a time
/// column; nothing for anything else.
pub fn build_pre_aggregations(
    table: &TableInfo,
    sql_table: &str,
    count_measure: &str,
    dimensions: &[DimensionDef],
    rules: &PreAggregationRules,
) -> Vec<PreAggregationDef> {
    if table.classification != TableClassification::Fact {
        return Vec::new();
    }
    let time_dimension = match dimensions
        .iter()
        .find(|d| d.dimension_type == DimensionType::Time)
    {
        Some(dimension) => dimension,
        None => return Vec::new(),
    };

    let grouping = dimensions
        .iter()
        .filter(|d| {
            let name = d.column.to_lowercase();
            rules
                .preferred_dimensions
                .iter()
                .any(|p| name.contains(p.as_str()))
        })
        .take(rules.max_dimensions)
        .map(|d| format!("CUBE.{}", d.name))
        .collect();

    let time_column = super::naming::quote_identifier(&time_dimension.column);
    vec![PreAggregationDef {
        name: "main_rollup".to_string(),
        measures: vec![format!("CUBE.{}", count_measure)],
        dimensions: grouping,
        time_dimension: format!("CUBE.{}", time_dimension.name),
        granularity: rules.granularity.clone(),
        partition_granularity: rules.partition_granularity.clone(),
        refresh_key: RefreshKey {
            every: rules.refresh_every.clone(),
        },
        build_range_start: SqlExpr {
            sql: format!("SELECT MIN({}) FROM {}", time_column, sql_table),
        },
        build_range_end: SqlExpr {
            sql: format!("SELECT MAX({}) FROM {}", time_column, sql_table),
        },
    }]
}
