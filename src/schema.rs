//! In-memory relational schema graph produced by introspection.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Catalog type string, passed through unmodified (e.g. `character varying(255)`).
    pub source_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    pub ordinal_position: i32,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ColumnRef>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    pub fn new(name: &str, source_type: &str, ordinal_position: i32) -> Self {
        Self {
            name: name.to_string(),
            source_type: source_type.to_string(),
            nullable: true,
            ordinal_position,
            is_primary_key: false,
            references: None,
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        self.references.is_some()
    }

    /// Primary and foreign key columns are never aggregated.
    pub fn is_key(&self) -> bool {
        self.is_primary_key || self.is_foreign_key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// A foreign key constraint. Composite keys keep their column pairs in
/// constraint order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.referenced_columns.iter())
            .map(|(local, remote)| (local.as_str(), remote.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableClassification {
    Fact,
    #[default]
    Dimension,
    Junction,
}

impl fmt::Display for TableClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableClassification::Fact => write!(f, "fact"),
            TableClassification::Dimension => write!(f, "dimension"),
            TableClassification::Junction => write!(f, "junction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainTag {
    Ecommerce,
    Saas,
    Finance,
    #[default]
    Generic,
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainTag::Ecommerce => write!(f, "ecommerce"),
            DomainTag::Saas => write!(f, "saas"),
            DomainTag::Finance => write!(f, "finance"),
            DomainTag::Generic => write!(f, "generic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub classification: TableClassification,
    #[serde(default)]
    pub domain: DomainTag,
}

impl TableInfo {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.to_string(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            classification: TableClassification::default(),
            domain: DomainTag::default(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    /// Sets the classification once; later stages only read it.
    pub fn classified(mut self, classification: TableClassification, domain: DomainTag) -> Self {
        self.classification = classification;
        self.domain = domain;
        self
    }

    /// Builder used by snapshots and tests.
    pub fn with_column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a single-column foreign key and flags the local column.
    pub fn with_foreign_key(mut self, column: &str, table: &str, referenced: &str) -> Self {
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == column) {
            col.references = Some(ColumnRef {
                table: table.to_string(),
                column: referenced.to_string(),
            });
        }
        self.foreign_keys.push(ForeignKey {
            name: format!("{}_{}_fkey", self.name, column),
            columns: vec![column.to_string()],
            referenced_schema: self.schema.clone(),
            referenced_table: table.to_string(),
            referenced_columns: vec![referenced.to_string()],
        });
        self
    }
}
