use super::{IntrospectError, SchemaIntrospector, TableFilter};
use crate::schema::TableInfo;
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// On-disk form of an introspected schema, with optional sample rows keyed
/// by table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub samples: BTreeMap<String, Vec<Value>>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self {
            tables,
            samples: BTreeMap::new(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, IntrospectError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| IntrospectError::Snapshot(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| IntrospectError::Snapshot(format!("{}: {}", path.display(), e)))
    }

    pub fn write(&self, path: &Path) -> Result<(), IntrospectError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IntrospectError::Snapshot(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| IntrospectError::Snapshot(format!("{}: {}", path.display(), e)))?;
        info!("Wrote schema snapshot to {}", path.display());
        Ok(())
    }
}

/// Serves a [`SchemaSnapshot`] instead of a live database.
#[derive(Debug, Clone, Default)]
pub struct LocalIntrospector {
    snapshot: SchemaSnapshot,
}

impl LocalIntrospector {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        LocalIntrospector { snapshot }
    }

    pub fn from_path(path: &Path) -> Result<Self, IntrospectError> {
        let snapshot = SchemaSnapshot::read(path)?;
        info!(
            "Loaded {} tables from snapshot {}",
            snapshot.tables.len(),
            path.display()
        );
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl SchemaIntrospector for LocalIntrospector {
    async fn introspect(&self, filter: &TableFilter) -> Result<Vec<TableInfo>, IntrospectError> {
        if !self.snapshot.tables.iter().any(|t| t.schema == filter.schema) {
            return Err(IntrospectError::SchemaNotFound(filter.schema.clone()));
        }

        let mut tables: Vec<TableInfo> = self
            .snapshot
            .tables
            .iter()
            .filter(|t| t.schema == filter.schema && filter.allows(&t.name))
            .cloned()
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        for missing in filter.missing(&tables) {
            warn!("Table {}.{} not found, skipping", filter.schema, missing);
        }
        Ok(tables)
    }

    async fn sample_rows(
        &self,
        table: &TableInfo,
        limit: usize,
    ) -> Result<Vec<Value>, IntrospectError> {
        Ok(self
            .snapshot
            .samples
            .get(&table.name)
            .map(|rows| rows.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
