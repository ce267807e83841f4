//! Schema introspection: a live PostgreSQL catalog or a local JSON
//! snapshot of one.

pub mod local;
pub mod postgres;

pub use local::{LocalIntrospector, SchemaSnapshot};
pub use postgres::PostgresIntrospector;

use crate::schema::TableInfo;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("could not connect to the database: {0}")]
    Connection(String),
    #[error("schema '{0}' does not exist")]
    SchemaNotFound(String),
    #[error("catalog query failed: {0}")]
    Query(String),
    #[error("invalid schema snapshot: {0}")]
    Snapshot(String),
}

/// Which tables to introspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    pub schema: String,
    /// Allow-list of table names; `None` means every base table.
    pub tables: Option<Vec<String>>,
}

impl TableFilter {
    pub fn schema(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            tables: None,
        }
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = if tables.is_empty() { None } else { Some(tables) };
        self
    }

    pub fn allows(&self, table: &str) -> bool {
        match &self.tables {
            Some(tables) => tables.iter().any(|t| t == table),
            None => true,
        }
    }

    /// Allow-listed names that matched nothing.
    pub fn missing<'a>(&'a self, found: &[TableInfo]) -> Vec<&'a str> {
        self.tables
            .iter()
            .flatten()
            .filter(|wanted| !found.iter().any(|t| &t.name == *wanted))
            .map(|s| s.as_str())
            .collect()
    }
}

#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Tables matching the filter, ordered by name.
    async fn introspect(&self, filter: &TableFilter) -> Result<Vec<TableInfo>, IntrospectError>;

    /// Up to `limit` rows of the table as JSON objects.
    async fn sample_rows(
        &self,
        table: &TableInfo,
        limit: usize,
    ) -> Result<Vec<Value>, IntrospectError>;
}

#[async_trait]
impl<T: SchemaIntrospector + ?Sized> SchemaIntrospector for Box<T> {
    async fn introspect(&self, filter: &TableFilter) -> Result<Vec<TableInfo>, IntrospectError> {
        (**self).introspect(filter).await
    }

    async fn sample_rows(
        &self,
        table: &TableInfo,
        limit: usize,
    ) -> Result<Vec<Value>, IntrospectError> {
        (**self).sample_rows(table, limit).await
    }
}
