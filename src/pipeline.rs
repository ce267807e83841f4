//! End-to-end generation: introspect, classify, synthesize, join, describe,
//! build views, emit.

use crate::catalog::{IntrospectError, SchemaIntrospector, SchemaSnapshot, TableFilter};
use crate::classifier::classify_all;
use crate::config::ConfigError;
use crate::describe::{DescriptionProvider, MemberDescriptions, TableContext};
use crate::domain::{detect_domain, DomainProfile};
use crate::emitter::{render_cube, render_view, Emitter, WriteError, CUBES_DIR, VIEWS_DIR};
use crate::joins::{resolve_joins, JoinOptions};
use crate::rules::GeneratorRules;
use crate::schema::{DomainTag, TableClassification, TableInfo};
use crate::semantic_model::{CubeModel, ViewModel};
use crate::synthesizer::{synthesize_all, SynthesisOptions};
use crate::type_mapper::TypeOverride;
use crate::views::build_views;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Introspect(#[from] IntrospectError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("{0} output file(s) could not be written")]
    PartialWrite(usize),
}

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub filter: TableFilter,
    /// Forced domain; detected from table names when `None`.
    pub domain: Option<DomainTag>,
    pub synthesis: SynthesisOptions,
    pub type_overrides: Vec<TypeOverride>,
    pub joins: JoinOptions,
    pub views: bool,
    /// Sample rows fetched per table for the description provider.
    pub sample_rows: usize,
    pub concurrency: usize,
}

impl GeneratorOptions {
    pub fn new(filter: TableFilter) -> Self {
        GeneratorOptions {
            filter,
            domain: None,
            synthesis: SynthesisOptions::default(),
            type_overrides: Vec::new(),
            joins: JoinOptions::default(),
            views: true,
            sample_rows: 0,
            concurrency: 1,
        }
    }
}

/// Everything one run produced, before it is written anywhere.
#[derive(Debug, Clone)]
pub struct GeneratedModel {
    pub domain: DomainTag,
    pub tables: Vec<TableInfo>,
    pub cubes: Vec<CubeModel>,
    pub views: Vec<ViewModel>,
}

#[derive(Debug, Serialize)]
pub struct CubeSummary {
    pub name: String,
    pub table: String,
    pub classification: TableClassification,
    pub domain: DomainTag,
    pub measures: usize,
    pub dimensions: usize,
    pub segments: usize,
    pub joins: usize,
    pub pre_aggregations: usize,
}

#[derive(Debug, Serialize)]
pub struct GenerationSummary {
    pub domain: DomainTag,
    pub description_provider: String,
    pub cubes: Vec<CubeSummary>,
    pub views: Vec<String>,
}

impl GeneratedModel {
    pub fn summary(&self, description_provider: &str) -> GenerationSummary {
        GenerationSummary {
            domain: self.domain,
            description_provider: description_provider.to_string(),
            cubes: self
                .cubes
                .iter()
                .map(|c| CubeSummary {
                    name: c.name.clone(),
                    table: c.sql_table.clone(),
                    classification: c.classification,
                    domain: c.domain,
                    measures: c.measures.len(),
                    dimensions: c.dimensions.len(),
                    segments: c.segments.len(),
                    joins: c.joins.len(),
                    pre_aggregations: c.pre_aggregations.len(),
                })
                .collect(),
            views: self.views.iter().map(|v| v.name.clone()).collect(),
        }
    }

    /// Every output file as one multi-document YAML stream.
    pub fn render(&self) -> Result<String, WriteError> {
        let mut out = String::new();
        for cube in &self.cubes {
            out.push_str(&format!("---\n# {}/{}.yml\n", CUBES_DIR, cube.name));
            out.push_str(&render_cube(cube)?);
        }
        for view in &self.views {
            out.push_str(&format!("---\n# {}/{}.yml\n", VIEWS_DIR, view.name));
            out.push_str(&render_view(view)?);
        }
        Ok(out)
    }
}

pub struct Generator<I, P> {
    introspector: I,
    descriptions: P,
    options: GeneratorOptions,
}

impl<I: SchemaIntrospector, P: DescriptionProvider> Generator<I, P> {
    pub fn new(introspector: I, descriptions: P, options: GeneratorOptions) -> Self {
        Generator {
            introspector,
            descriptions,
            options,
        }
    }

    pub fn description_provider(&self) -> &str {
        self.descriptions.name()
    }

    pub async fn generate(&self) -> Result<GeneratedModel, GenerateError> {
        let tables = self.introspector.introspect(&self.options.filter).await?;
        if tables.is_empty() {
            warn!("No tables found in schema {}", self.options.filter.schema);
        }

        let profile = match self.options.domain {
            Some(tag) => DomainProfile::for_tag(tag),
            None => detect_domain(&tables),
        };
        info!("Using domain profile: {}", profile.tag);
        let rules =
            GeneratorRules::new(profile).with_type_overrides(&self.options.type_overrides);

        let tables = classify_all(tables, &rules.domain);

        let mut cubes = synthesize_all(&tables, &rules, &self.options.synthesis);

        for (cube, joins) in cubes
            .iter_mut()
            .zip(resolve_joins(&tables, &self.options.joins))
        {
            cube.joins = joins;
        }

        self.describe(&tables, &mut cubes, &rules).await;

        for cube in &cubes {
            for problem in cube.validate() {
                warn!("{}", problem);
            }
        }

        let views = if self.options.views {
            build_views(&cubes)
        } else {
            Vec::new()
        };
        for view in &views {
            for problem in view.validate(&cubes) {
                warn!("{}", problem);
            }
        }

        Ok(GeneratedModel {
            domain: rules.domain.tag,
            tables,
            cubes,
            views,
        })
    }

    /// Generates and writes everything. Units that fail to write are
    /// reported together at the end.
    pub async fn run(
        &self,
        emitter: &Emitter,
        write_summary: bool,
    ) -> Result<GeneratedModel, GenerateError> {
        let model = self.generate().await?;
        self.write(emitter, &model, write_summary)?;
        Ok(model)
    }

    pub fn write(
        &self,
        emitter: &Emitter,
        model: &GeneratedModel,
        write_summary: bool,
    ) -> Result<(), GenerateError> {
        let report = emitter.emit(model.domain, &model.cubes, &model.views);
        let mut failures = report.failures.len();

        if write_summary {
            match emitter.emit_summary(&model.summary(self.descriptions.name())) {
                Ok(path) => info!("Wrote summary to {}", path.display()),
                Err(e) => {
                    warn!("{}", e);
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            return Err(GenerateError::PartialWrite(failures));
        }
        info!(
            "Generated {} cubes and {} views",
            model.cubes.len(),
            model.views.len()
        );
        Ok(())
    }

    /// Writes the introspected schema as a snapshot, with sample rows when
    /// configured.
    pub async fn dump_schema(&self, path: &Path) -> Result<usize, GenerateError> {
        let tables = self.introspector.introspect(&self.options.filter).await?;
        let mut snapshot = SchemaSnapshot::new(tables);
        if self.options.sample_rows > 0 {
            for table in &snapshot.tables {
                let rows = self.samples(table).await;
                if !rows.is_empty() {
                    snapshot.samples.insert(table.name.clone(), rows);
                }
            }
        }
        snapshot.write(path)?;
        Ok(snapshot.tables.len())
    }

    async fn samples(&self, table: &TableInfo) -> Vec<serde_json::Value> {
        if self.options.sample_rows == 0 {
            return Vec::new();
        }
        match self
            .introspector
            .sample_rows(table, self.options.sample_rows)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("No sample rows for {}: {}", table.qualified_name(), e);
                Vec::new()
            }
        }
    }

    async fn describe(&self, tables: &[TableInfo], cubes: &mut [CubeModel], rules: &GeneratorRules) {
        let mut contexts = Vec::with_capacity(tables.len());
        for table in tables {
            let samples = self.samples(table).await;
            contexts.push(TableContext::new(table, &rules.type_mapper, samples));
        }

        let described: Vec<MemberDescriptions> = stream::iter(contexts.iter().zip(cubes.iter()))
            .map(|(context, cube)| self.descriptions.describe(context, cube))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        for (cube, descriptions) in cubes.iter_mut().zip(described) {
            descriptions.apply(cube);
        }
    }
}
