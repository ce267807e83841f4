//! Command-line surface. Every connection flag overrides the matching
//! environment variable.

use clap::Parser;
use cubegen::config::{LlmConfig, OutputConfig, PostgresConfig};
use cubegen::schema::DomainTag;
use cubegen::type_mapper::TypeOverride;
use std::path::PathBuf;

/// Generate Cube.dev data models from a PostgreSQL schema
#[derive(Parser, Debug)]
#[command(name = "cubegen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database host [env: POSTGRES_HOST]
    #[arg(long)]
    pub host: Option<String>,

    /// Database port [env: POSTGRES_PORT]
    #[arg(long)]
    pub port: Option<u16>,

    /// Database name [env: POSTGRES_DB]
    #[arg(short, long)]
    pub database: Option<String>,

    /// Database user [env: POSTGRES_USER]
    #[arg(short, long)]
    pub user: Option<String>,

    /// Database password [env: POSTGRES_PASSWORD]
    #[arg(long)]
    pub password: Option<String>,

    /// Schema to introspect [env: POSTGRES_SCHEMA]
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Only these tables (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Business domain: ecommerce, saas, finance or generic (default: detect)
    #[arg(long)]
    pub domain: Option<DomainTag>,

    /// Output directory [env: OUTPUT_DIR]
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Describe members with an LLM (needs OPENAI_API_KEY)
    #[arg(long)]
    pub llm: bool,

    /// LLM model name [env: LLM_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// Read the schema from a JSON snapshot instead of a database
    #[arg(long, conflicts_with = "dump_schema")]
    pub schema_snapshot: Option<PathBuf>,

    /// Write the introspected schema to a JSON snapshot and exit
    #[arg(long)]
    pub dump_schema: Option<PathBuf>,

    /// Add a daily rollup pre-aggregation to fact cubes
    #[arg(long)]
    pub pre_aggregations: bool,

    /// Add one_to_many joins from parent to child tables
    #[arg(long)]
    pub reverse_joins: bool,

    /// Infer joins from `<table>_id` column names
    #[arg(long)]
    pub infer_joins: bool,

    /// Map an unknown column type, e.g. `mood_enum=string` (repeatable)
    #[arg(long = "type-override", value_name = "TYPE=DIMENSION")]
    pub type_overrides: Vec<TypeOverride>,

    /// Skip view generation
    #[arg(long)]
    pub no_views: bool,

    /// Move existing cube and view files to a timestamped backup directory first
    #[arg(long)]
    pub backup_existing: bool,

    /// Print the generated YAML instead of writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Also write generation_summary.json
    #[arg(long)]
    pub summary: bool,
}

impl Cli {
    pub fn apply_postgres(&self, config: &mut PostgresConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.dbname = database.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(schema) = &self.schema {
            config.schema = schema.clone();
        }
    }

    pub fn apply_llm(&self, config: &mut LlmConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
    }

    pub fn apply_output(&self, config: &mut OutputConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }

    /// Rows sampled per table. Snapshots always carry them; generation only
    /// needs them for the LLM.
    pub fn sample_rows(&self, config: &LlmConfig, uses_llm: bool) -> usize {
        if uses_llm || self.dump_schema.is_some() {
            config.sample_rows
        } else {
            0
        }
    }

    /// Flags that have no effect in the selected mode.
    pub fn ignored_flags(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.dump_schema.is_some() && self.dry_run {
            ignored.push("--dry-run");
        }
        if self.dump_schema.is_some() || self.dry_run {
            if self.summary {
                ignored.push("--summary");
            }
            if self.backup_existing {
                ignored.push("--backup-existing");
            }
        }
        ignored
    }
}
