//! Per-table cube synthesis: dimensions, measures, segments and optional
//! pre-aggregations, all with template descriptions.
//!
//! Joins are attached afterwards by the join resolver since they need the
//! whole table set.

pub mod dimensions;
pub mod measures;
pub mod naming;
pub mod pre_aggregations;
pub mod segments;

use crate::describe::template::cube_description;
use crate::rules::GeneratorRules;
use crate::schema::TableInfo;
use crate::semantic_model::CubeModel;
use log::{info, warn};
use naming::{quote_identifier, sanitize_name, NameRegistry};

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisOptions {
    pub pre_aggregations: bool,
}

pub fn cube_name(table: &str) -> String {
    sanitize_name(table)
}

/// Cube names for a whole table set, aligned with `tables`.
///
/// Tables whose name is already a valid cube name keep it; the rest take
/// the next free `_2`, `_3`, ... suffix when two tables sanitize alike.
pub fn cube_names(tables: &[TableInfo]) -> Vec<String> {
    let (exact, renamed): (Vec<usize>, Vec<usize>) =
        (0..tables.len()).partition(|&i| cube_name(&tables[i].name) == tables[i].name);

    let mut names = NameRegistry::new();
    let mut resolved = vec![String::new(); tables.len()];
    for i in exact.into_iter().chain(renamed) {
        let preferred = cube_name(&tables[i].name);
        let name = names.claim(&preferred);
        if name != preferred {
            warn!(
                "Cube name {} is already taken, using {} for {}",
                preferred,
                name,
                tables[i].qualified_name()
            );
        }
        resolved[i] = name;
    }
    resolved
}

/// Synthesizes every table with cube names unique across the set.
pub fn synthesize_all(
    tables: &[TableInfo],
    rules: &GeneratorRules,
    options: &SynthesisOptions,
) -> Vec<CubeModel> {
    tables
        .iter()
        .zip(cube_names(tables))
        .map(|(table, name)| {
            info!(
                "Generating cube {} for {} ({})",
                name,
                table.qualified_name(),
                table.classification
            );
            CubeModel {
                name,
                ..synthesize(table, rules, options)
            }
        })
        .collect()
}

pub fn sql_table(table: &TableInfo) -> String {
    format!(
        "{}.{}",
        quote_identifier(&table.schema),
        quote_identifier(&table.name)
    )
}

pub fn synthesize(
    table: &TableInfo,
    rules: &GeneratorRules,
    options: &SynthesisOptions,
) -> CubeModel {
    let mut names = NameRegistry::new();
    let sql_table = sql_table(table);

    // Dimensions claim their names first so measures get the prefix on collision.
    let dimensions = dimensions::build_dimensions(table, &rules.type_mapper, &mut names);
    let measures = measures::build_measures(table, &dimensions, &rules.formats, &mut names);
    let segments = segments::build_segments(&dimensions, &rules.segments, &mut names);

    let pre_aggregations = if options.pre_aggregations {
        pre_aggregations::build_pre_aggregations(
            table,
            &sql_table,
            &measures[0].name,
            &dimensions,
            &rules.pre_aggregations,
        )
    } else {
        Vec::new()
    };

    CubeModel {
        name: cube_name(&table.name),
        sql_table,
        description: cube_description(&table.name, table.classification),
        measures,
        dimensions,
        segments,
        joins: Vec::new(),
        pre_aggregations,
        table: table.name.clone(),
        classification: table.classification,
        domain: table.domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnInfo, DomainTag, TableClassification};
    use crate::semantic_model::{DimensionType, MeasureFormat};
    use rstest::{fixture, rstest};

    #[fixture]
    fn orders() -> TableInfo {
        TableInfo::new("public", "orders")
            .with_column(ColumnInfo {
                is_primary_key: true,
                nullable: false,
                ..ColumnInfo::new("order_id", "character varying", 1)
            })
            .with_column(ColumnInfo::new("customer_id", "character varying", 2))
            .with_column(ColumnInfo::new("order_status", "character varying", 3))
            .with_column(ColumnInfo::new(
                "order_purchase_timestamp",
                "timestamp without time zone",
                4,
            ))
            .with_foreign_key("customer_id", "customers", "customer_id")
            .classified(TableClassification::Fact, DomainTag::Ecommerce)
    }

    #[rstest]
    fn test_orders_cube(orders: TableInfo) {
        let cube = synthesize(&orders, &GeneratorRules::default(), &SynthesisOptions::default());

        assert_eq!(cube.name, "orders");
        assert_eq!(cube.sql_table, "public.orders");
        assert_eq!(cube.description, "Orders transaction and metrics data");

        let dims: Vec<_> = cube.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            dims,
            vec!["order_id", "customer_id", "order_status", "order_purchase_timestamp"]
        );
        assert!(cube.dimension("order_id").unwrap().primary_key);
        assert!(!cube.dimension("customer_id").unwrap().primary_key);
        let ts = cube.dimension("order_purchase_timestamp").unwrap();
        assert_eq!(ts.dimension_type, DimensionType::Time);
        assert_eq!(ts.granularities.len(), 6);

        let measures: Vec<_> = cube.measures.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(measures, vec!["count", "count_distinct"]);
        assert_eq!(
            cube.measure("count_distinct").unwrap().sql.as_deref(),
            Some("{CUBE}.order_id")
        );
        assert!(cube.pre_aggregations.is_empty());
        assert!(cube.validate().is_empty());
    }

    #[rstest]
    fn test_pre_aggregations_are_opt_in(orders: TableInfo) {
        let options = SynthesisOptions {
            pre_aggregations: true,
        };
        let cube = synthesize(&orders, &GeneratorRules::default(), &options);
        assert_eq!(cube.pre_aggregations[0].name, "main_rollup");
    }

    #[rstest]
    #[case::no_numeric(vec![("name", "text")], 2)]
    #[case::one_numeric(vec![("name", "text"), ("price", "numeric")], 6)]
    #[case::two_numeric(vec![("qty", "integer"), ("price", "real"), ("at", "date")], 10)]
    fn test_measure_count_formula(#[case] columns: Vec<(&str, &str)>, #[case] expected: usize) {
        let mut table = TableInfo::new("public", "items").with_column(ColumnInfo {
            is_primary_key: true,
            ..ColumnInfo::new("id", "bigint", 0)
        });
        for (i, (name, ty)) in columns.iter().enumerate() {
            table = table.with_column(ColumnInfo::new(name, ty, i as i32 + 1));
        }
        let cube = synthesize(&table, &GeneratorRules::default(), &SynthesisOptions::default());
        assert_eq!(cube.dimensions.len(), table.columns.len());
        assert_eq!(cube.measures.len(), expected);
    }

    #[test]
    fn test_payment_value_measures_are_currency() {
        let table = TableInfo::new("public", "order_payments")
            .with_column(ColumnInfo::new("order_id", "text", 1))
            .with_column(ColumnInfo::new("payment_value", "double precision", 2))
            .with_foreign_key("order_id", "orders", "order_id");
        let cube = synthesize(&table, &GeneratorRules::default(), &SynthesisOptions::default());
        for name in [
            "sum_payment_value",
            "avg_payment_value",
            "min_payment_value",
            "max_payment_value",
        ] {
            let measure = cube.measure(name).unwrap();
            assert_eq!(measure.format, Some(MeasureFormat::Currency), "{}", name);
            assert_eq!(measure.sql.as_deref(), Some("{CUBE}.payment_value"));
        }
    }

    #[test]
    fn test_quoted_sql_table() {
        let table = TableInfo::new("Sales", "Order Lines");
        assert_eq!(sql_table(&table), "\"Sales\".\"Order Lines\"");
        assert_eq!(cube_name(&table.name), "order_lines");
    }

    #[test]
    fn test_cube_names_are_unique_across_tables() {
        let tables = vec![
            TableInfo::new("public", "Orders"),
            TableInfo::new("public", "orders"),
            TableInfo::new("public", "ORDERS"),
            TableInfo::new("public", "customers"),
        ];
        assert_eq!(
            cube_names(&tables),
            vec!["orders_2", "orders", "orders_3", "customers"]
        );

        let cubes = synthesize_all(&tables, &GeneratorRules::default(), &SynthesisOptions::default());
        let named: Vec<_> = cubes
            .iter()
            .map(|c| (c.name.as_str(), c.sql_table.as_str()))
            .collect();
        assert_eq!(named[0], ("orders_2", "public.\"Orders\""));
        assert_eq!(named[1], ("orders", "public.orders"));
    }
}
