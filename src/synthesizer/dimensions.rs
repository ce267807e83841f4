use super::naming::{cube_column, sanitize_name, NameRegistry};
use crate::describe::template::dimension_description;
use crate::schema::TableInfo;
use crate::semantic_model::{time_granularities, DimensionDef, DimensionType};
use crate::type_mapper::TypeMapper;
use log::warn;

/// One dimension per column, in column order.
pub fn build_dimensions(
    table: &TableInfo,
    mapper: &TypeMapper,
    names: &mut NameRegistry,
) -> Vec<DimensionDef> {
    table
        .columns
        .iter()
        .map(|column| {
            let dimension_type = match mapper.map(&column.source_type) {
                Ok(mapped) => mapped,
                Err(e) => {
                    warn!(
                        "{} on {}.{}, using string",
                        e,
                        table.qualified_name(),
                        column.name
                    );
                    DimensionType::String
                }
            };
            let granularities = if dimension_type == DimensionType::Time {
                time_granularities()
            } else {
                Vec::new()
            };
            DimensionDef {
                name: names.claim(&sanitize_name(&column.name)),
                sql: cube_column(&column.name),
                dimension_type,
                description: dimension_description(&column.name),
                primary_key: column.is_primary_key,
                granularities,
                column: column.name.clone(),
            }
        })
        .collect()
}
