use super::naming::{cube_column, NameRegistry};
use crate::rules::SegmentRule;
use crate::semantic_model::{DimensionDef, SegmentDef};
use std::collections::BTreeSet;

/// Instantiates every matching segment template; the first column to
/// produce a given template name wins.
pub fn build_segments(
    dimensions: &[DimensionDef],
    rules: &[SegmentRule],
    names: &mut NameRegistry,
) -> Vec<SegmentDef> {
    let mut produced = BTreeSet::new();
    let mut segments = Vec::new();

    for rule in rules {
        for dimension in dimensions {
            if !rule.matches(&dimension.column, dimension.dimension_type) {
                continue;
            }
            for template in &rule.segments {
                if !produced.insert(template.name.clone()) {
                    continue;
                }
                segments.push(SegmentDef {
                    name: names.claim(&template.name),
                    sql: format!("{} {}", cube_column(&dimension.column), template.condition),
                    description: template.description.clone(),
                });
            }
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_segment_rules;
    use crate::schema::{ColumnInfo, TableInfo};
    use crate::synthesizer::dimensions::build_dimensions;
    use crate::type_mapper::TypeMapper;

    fn segments_for(table: &TableInfo) -> Vec<SegmentDef> {
        let mut names = NameRegistry::new();
        let dims = build_dimensions(table, &TypeMapper::new(), &mut names);
        build_segments(&dims, &default_segment_rules(), &mut names)
    }

    #[test]
    fn test_status_and_timestamp_segments() {
        let table = TableInfo::new("public", "accounts")
            .with_column(ColumnInfo::new("status", "character varying", 1))
            .with_column(ColumnInfo::new("created_at", "timestamp", 2))
            .with_column(ColumnInfo::new("updated_at", "timestamp", 3));
        let segments = segments_for(&table);
        let names: Vec<_> = segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["active", "inactive", "recent", "this_year", "this_month"]
        );
        assert_eq!(segments[0].sql, "{CUBE}.status = 'active'");
        assert_eq!(
            segments[2].sql,
            "{CUBE}.created_at >= CURRENT_DATE - INTERVAL '30 days'"
        );
    }

    #[test]
    fn test_segment_does_not_shadow_a_dimension() {
        let table =
            TableInfo::new("public", "features").with_column(ColumnInfo::new("active", "boolean", 1));
        let segments = segments_for(&table);
        assert_eq!(segments[0].name, "active_2");
        assert_eq!(segments[0].sql, "{CUBE}.active = true");
        assert_eq!(segments[1].name, "inactive");
    }

    #[test]
    fn test_no_matching_columns_means_no_segments() {
        let table =
            TableInfo::new("public", "sellers").with_column(ColumnInfo::new("seller_city", "text", 1));
        assert!(segments_for(&table).is_empty());
    }
}
