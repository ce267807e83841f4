//! Foreign-key derived join edges between cubes.
//!
//! Only direct edges are produced; multi-hop paths are left to the query
//! engine.

use crate::schema::{ForeignKey, TableInfo};
use crate::semantic_model::{JoinDef, Relationship};
use crate::synthesizer::cube_names;
use crate::synthesizer::naming::{cube_column, quote_identifier, sanitize_name};
use log::{debug, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct JoinOptions {
    /// Also emit the parent → child `one_to_many` edge for every key.
    pub reverse: bool,
    /// Guess edges from `<name>_id` columns without a declared key.
    pub infer: bool,
}

/// A validated child → parent edge, indexes into the table slice.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    child: usize,
    parent: usize,
    on: Vec<(String, String)>,
}

/// Joins for every table, aligned with `tables`.
pub fn resolve_joins(tables: &[TableInfo], options: &JoinOptions) -> Vec<Vec<JoinDef>> {
    let mut edges = declared_edges(tables);
    if options.infer {
        edges.extend(inferred_edges(tables));
    }
    let names = cube_names(tables);

    let mut joins: Vec<Vec<JoinDef>> = vec![Vec::new(); tables.len()];
    for (child, parent_edges) in group_by(&edges, |e| e.child) {
        joins[child].extend(name_joins(
            tables,
            &names,
            &parent_edges,
            |e| e.parent,
            |e| e.on.iter().map(|(l, _)| l.as_str()).collect(),
            Relationship::ManyToOne,
        ));
    }

    if options.reverse {
        for (parent, child_edges) in group_by(&edges, |e| e.parent) {
            let flipped: Vec<Edge> = child_edges
                .into_iter()
                .map(|e| Edge {
                    child: e.parent,
                    parent: e.child,
                    on: e.on.iter().map(|(l, r)| (r.clone(), l.clone())).collect(),
                })
                .collect();
            let reversed = name_joins(
                tables,
                &names,
                &flipped,
                |e| e.parent,
                |e| e.on.iter().map(|(_, r)| r.as_str()).collect(),
                Relationship::OneToMany,
            );
            for join in reversed {
                if joins[parent].iter().any(|j| j.name == join.name) {
                    debug!(
                        "Skipping reverse join {} on {}: name already used",
                        join.name, tables[parent].name
                    );
                    continue;
                }
                joins[parent].push(join);
            }
        }
    }

    joins
}

fn group_by(edges: &[Edge], key: impl Fn(&Edge) -> usize) -> BTreeMap<usize, Vec<Edge>> {
    let mut grouped: BTreeMap<usize, Vec<Edge>> = BTreeMap::new();
    for edge in edges {
        grouped.entry(key(edge)).or_default().push(edge.clone());
    }
    grouped
}

/// Names joins after the target cube; targets reached more than once get
/// the distinguishing columns appended.
fn name_joins(
    tables: &[TableInfo],
    names: &[String],
    edges: &[Edge],
    target: impl Fn(&Edge) -> usize,
    suffix_columns: impl Fn(&Edge) -> Vec<&str>,
    relationship: Relationship,
) -> Vec<JoinDef> {
    let mut per_target: BTreeMap<usize, usize> = BTreeMap::new();
    for edge in edges {
        *per_target.entry(target(edge)).or_default() += 1;
    }

    edges
        .iter()
        .map(|edge| {
            let target_table = &tables[target(edge)];
            let target_cube = &names[target(edge)];
            let name = if per_target[&target(edge)] > 1 {
                format!(
                    "{}_{}",
                    target_cube,
                    sanitize_name(&suffix_columns(edge).join("_"))
                )
            } else {
                target_cube.clone()
            };
            let sql = edge
                .on
                .iter()
                .map(|(local, remote)| {
                    format!(
                        "{} = {{{}}}.{}",
                        cube_column(local),
                        target_cube,
                        quote_identifier(remote)
                    )
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            JoinDef {
                name,
                relationship,
                sql,
                source_table: tables[edge.child].name.clone(),
                target_table: target_table.name.clone(),
                target_cube: target_cube.clone(),
                on: edge.on.clone(),
            }
        })
        .collect()
}

fn find_table(tables: &[TableInfo], schema: &str, name: &str) -> Option<usize> {
    tables
        .iter()
        .position(|t| t.schema == schema && t.name == name)
}

fn declared_edges(tables: &[TableInfo]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (child, table) in tables.iter().enumerate() {
        for fk in &table.foreign_keys {
            if let Some(edge) = validate_foreign_key(tables, child, fk) {
                edges.push(edge);
            }
        }
    }
    edges
}

fn validate_foreign_key(tables: &[TableInfo], child: usize, fk: &ForeignKey) -> Option<Edge> {
    let table = &tables[child];
    let parent = match find_table(tables, &fk.referenced_schema, &fk.referenced_table) {
        Some(parent) => parent,
        None => {
            warn!(
                "Dropping join {} -> {}.{}: target table was not introspected",
                table.name, fk.referenced_schema, fk.referenced_table
            );
            return None;
        }
    };
    let target = &tables[parent];
    for (local, remote) in fk.column_pairs() {
        if !table.has_column(local) || !target.has_column(remote) {
            warn!(
                "Dropping join {} -> {}: column pair {} = {} does not exist on both sides",
                table.name, target.name, local, remote
            );
            return None;
        }
    }
    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
        warn!("Dropping join {} -> {}: malformed key {}", table.name, target.name, fk.name);
        return None;
    }
    Some(Edge {
        child,
        parent,
        on: fk
            .column_pairs()
            .map(|(l, r)| (l.to_string(), r.to_string()))
            .collect(),
    })
}

/// `customer_id` → `customers.customer_id` or `customers.id`, when the
/// target column is that table's primary key.
fn inferred_edges(tables: &[TableInfo]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (child, table) in tables.iter().enumerate() {
        for column in &table.columns {
            if column.is_foreign_key() || column.is_primary_key {
                continue;
            }
            let stem = match column.name.strip_suffix("_id") {
                Some(stem) if !stem.is_empty() => stem,
                _ => continue,
            };
            let candidates = [format!("{}s", stem), format!("{}es", stem), stem.to_string()];
            let parent = candidates.iter().find_map(|name| {
                find_table(tables, &table.schema, name).filter(|&p| p != child)
            });
            let Some(parent) = parent else { continue };
            let target = &tables[parent];
            let remote = [column.name.as_str(), "id"].into_iter().find(|name| {
                target
                    .column(name)
                    .map(|c| c.is_primary_key)
                    .unwrap_or(false)
            });
            if let Some(remote) = remote {
                debug!(
                    "Inferred join {}.{} -> {}.{}",
                    table.name, column.name, target.name, remote
                );
                edges.push(Edge {
                    child,
                    parent,
                    on: vec![(column.name.clone(), remote.to_string())],
                });
            }
        }
    }
    edges
}
