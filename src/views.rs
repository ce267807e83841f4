//! Cross-cube views derived from the finished cubes.

use crate::schema::TableClassification;
use crate::semantic_model::{CubeModel, DimensionType, Includes, ViewCube, ViewModel};
use std::collections::BTreeSet;

/// Views include at most this many cubes wholesale.
const MAX_WILDCARD_CUBES: usize = 3;

const FINANCIAL_TERMS: &[&str] = &["price", "value", "amount", "cost"];
const CORE_FACT_CUBES: &[&str] = &["orders", "order_items", "order_payments"];
const LINK_LIKE_SUFFIXES: &[&str] = &["_items", "_payments", "_reviews"];

pub fn build_views(cubes: &[CubeModel]) -> Vec<ViewModel> {
    [
        business_metrics(cubes),
        fact_analysis(cubes),
        dimension_catalog(cubes),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn wildcard(cube: &CubeModel) -> ViewCube {
    ViewCube {
        join_path: cube.name.clone(),
        includes: Includes::All,
        prefix: true,
    }
}

/// Cubes with money-like measures or more than the two universal counts.
fn business_metrics(cubes: &[CubeModel]) -> Option<ViewModel> {
    let selected: Vec<ViewCube> = cubes
        .iter()
        .filter(|cube| {
            let financial = cube
                .measures
                .iter()
                .any(|m| FINANCIAL_TERMS.iter().any(|t| m.name.contains(t)));
            financial || cube.measures.len() > 2 || CORE_FACT_CUBES.contains(&cube.name.as_str())
        })
        .take(MAX_WILDCARD_CUBES)
        .map(wildcard)
        .collect();
    if selected.is_empty() {
        return None;
    }
    Some(ViewModel {
        name: "business_metrics".to_string(),
        description: "Key business metrics across all entities".to_string(),
        cubes: selected,
    })
}

/// Every fact cube's measures and time dimensions, plus the descriptive
/// dimensions of the cubes it joins to.
fn fact_analysis(cubes: &[CubeModel]) -> Option<ViewModel> {
    let facts: Vec<&CubeModel> = cubes
        .iter()
        .filter(|c| c.classification == TableClassification::Fact)
        .collect();
    if facts.is_empty() {
        return None;
    }

    let mut view_cubes = Vec::new();
    for fact in &facts {
        let members = fact
            .measures
            .iter()
            .map(|m| m.name.clone())
            .chain(
                fact.dimensions
                    .iter()
                    .filter(|d| d.dimension_type == DimensionType::Time)
                    .map(|d| d.name.clone()),
            )
            .collect();
        view_cubes.push(ViewCube {
            join_path: fact.name.clone(),
            includes: Includes::Members(members),
            prefix: true,
        });

        let mut joined = BTreeSet::new();
        for join in &fact.joins {
            let target_name = &join.target_cube;
            if facts.iter().any(|f| &f.name == target_name) || !joined.insert(target_name.clone()) {
                continue;
            }
            let Some(target) = cubes.iter().find(|c| &c.name == target_name) else {
                continue;
            };
            let attributes: Vec<String> = target
                .dimensions
                .iter()
                .filter(|d| !d.primary_key && d.dimension_type == DimensionType::String)
                .filter(|d| !fact.dimensions.iter().any(|own| own.column == d.column))
                .map(|d| d.name.clone())
                .collect();
            if attributes.is_empty() {
                continue;
            }
            view_cubes.push(ViewCube {
                join_path: format!("{}.{}", fact.name, target_name),
                includes: Includes::Members(attributes),
                prefix: true,
            });
        }
    }

    Some(ViewModel {
        name: "fact_analysis".to_string(),
        description: "Analysis view for fact tables".to_string(),
        cubes: view_cubes,
    })
}

fn dimension_catalog(cubes: &[CubeModel]) -> Option<ViewModel> {
    let selected: Vec<ViewCube> = cubes
        .iter()
        .filter(|c| c.classification == TableClassification::Dimension)
        .filter(|c| !LINK_LIKE_SUFFIXES.iter().any(|s| c.name.contains(s)))
        .take(MAX_WILDCARD_CUBES)
        .map(wildcard)
        .collect();
    if selected.is_empty() {
        return None;
    }
    Some(ViewModel {
        name: "dimension_catalog".to_string(),
        description: "Catalog of all dimensional data".to_string(),
        cubes: selected,
    })
}
