//! Human-readable descriptions for cubes and their members.
//!
//! The synthesizer always fills in template text; a [`DescriptionProvider`]
//! chosen at startup may replace it.

pub mod llm;
pub mod openai;
pub mod template;

pub use llm::{LlmDescriptions, TextGenerator};
pub use openai::OpenAiClient;
pub use template::TemplateDescriptions;

use crate::schema::{DomainTag, TableClassification, TableInfo};
use crate::semantic_model::{CubeModel, DimensionType};
use crate::type_mapper::TypeMapper;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescribeError {
    #[error("description request failed: {0}")]
    Request(String),
    #[error("description service returned status {0}")]
    Status(u16),
    #[error("description request timed out")]
    Timeout,
    #[error("malformed description response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub source_type: String,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
    /// `table.column` of the referenced key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

/// What a description provider gets to see about one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableContext {
    pub table: String,
    pub schema: String,
    pub classification: TableClassification,
    pub domain: DomainTag,
    pub columns: Vec<ColumnSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_rows: Vec<Value>,
}

impl TableContext {
    pub fn new(table: &TableInfo, mapper: &TypeMapper, sample_rows: Vec<Value>) -> Self {
        TableContext {
            table: table.name.clone(),
            schema: table.schema.clone(),
            classification: table.classification,
            domain: table.domain,
            columns: table
                .columns
                .iter()
                .map(|c| ColumnSummary {
                    name: c.name.clone(),
                    source_type: c.source_type.clone(),
                    dimension_type: mapper.map_or_string(&c.source_type),
                    primary_key: c.is_primary_key,
                    references: c
                        .references
                        .as_ref()
                        .map(|r| format!("{}.{}", r.table, r.column)),
                })
                .collect(),
            sample_rows,
        }
    }
}

/// Description text keyed by member name. Absent entries leave the
/// current text alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDescriptions {
    pub cube: Option<String>,
    pub measures: BTreeMap<String, String>,
    pub dimensions: BTreeMap<String, String>,
}

impl MemberDescriptions {
    /// Entries from `other` win.
    pub fn merge(mut self, other: MemberDescriptions) -> Self {
        if other.cube.is_some() {
            self.cube = other.cube;
        }
        self.measures.extend(other.measures);
        self.dimensions.extend(other.dimensions);
        self
    }

    pub fn apply(self, cube: &mut CubeModel) {
        if let Some(description) = self.cube {
            cube.description = description;
        }
        for measure in cube.measures.iter_mut() {
            if let Some(description) = self.measures.get(&measure.name) {
                measure.description = description.clone();
            }
        }
        for dimension in cube.dimensions.iter_mut() {
            if let Some(description) = self.dimensions.get(&dimension.name) {
                dimension.description = description.clone();
            }
        }
    }
}

#[async_trait]
pub trait DescriptionProvider: Send + Sync {
    /// Never fails; providers that can fail fall back internally.
    async fn describe(&self, context: &TableContext, cube: &CubeModel) -> MemberDescriptions;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<P: DescriptionProvider + ?Sized> DescriptionProvider for Box<P> {
    async fn describe(&self, context: &TableContext, cube: &CubeModel) -> MemberDescriptions {
        (**self).describe(context, cube).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
