mod cli;

use chrono::Local;
use clap::Parser;
use cli::Cli;
use cubegen::catalog::{LocalIntrospector, PostgresIntrospector, SchemaIntrospector, TableFilter};
use cubegen::config::{LlmConfig, OutputConfig, PostgresConfig};
use cubegen::describe::{DescriptionProvider, LlmDescriptions, OpenAiClient, TemplateDescriptions};
use cubegen::emitter::Emitter;
use cubegen::joins::JoinOptions;
use cubegen::pipeline::{GenerateError, Generator, GeneratorOptions};
use cubegen::synthesizer::SynthesisOptions;
use log::{error, info, warn};
use std::process;

fn description_provider(cli: &Cli, config: &LlmConfig) -> Box<dyn DescriptionProvider> {
    if !cli.llm {
        return Box::new(TemplateDescriptions);
    }
    let Some(api_key) = config.api_key.clone() else {
        warn!("OPENAI_API_KEY is not set, using template descriptions");
        return Box::new(TemplateDescriptions);
    };
    match OpenAiClient::new(config, api_key) {
        Ok(client) => {
            info!("Using {} for descriptions", config.model);
            Box::new(LlmDescriptions::new(client))
        }
        Err(e) => {
            warn!("Failed to create LLM client, using template descriptions: {}", e);
            Box::new(TemplateDescriptions)
        }
    }
}

async fn run(cli: Cli) -> Result<(), GenerateError> {
    let mut postgres_config = PostgresConfig::new().map_err(|e| {
        error!("Failed to initialize Postgres config: {}", e);
        e
    })?;
    cli.apply_postgres(&mut postgres_config);

    let mut llm_config = LlmConfig::new().map_err(|e| {
        error!("Failed to initialize LLM config: {}", e);
        e
    })?;
    cli.apply_llm(&mut llm_config);

    let mut output_config = OutputConfig::new().map_err(|e| {
        error!("Failed to initialize output config: {}", e);
        e
    })?;
    cli.apply_output(&mut output_config);

    for flag in cli.ignored_flags() {
        warn!("{} has no effect in this mode and is ignored", flag);
    }

    let introspector: Box<dyn SchemaIntrospector> = match &cli.schema_snapshot {
        Some(path) => Box::new(LocalIntrospector::from_path(path)?),
        None => Box::new(PostgresIntrospector::connect(&postgres_config).await?),
    };

    let descriptions = description_provider(&cli, &llm_config);
    let uses_llm = descriptions.name() != TemplateDescriptions.name();

    let options = GeneratorOptions {
        domain: cli.domain,
        synthesis: SynthesisOptions {
            pre_aggregations: cli.pre_aggregations,
        },
        joins: JoinOptions {
            reverse: cli.reverse_joins,
            infer: cli.infer_joins,
        },
        type_overrides: cli.type_overrides.clone(),
        views: !cli.no_views,
        sample_rows: cli.sample_rows(&llm_config, uses_llm),
        concurrency: llm_config.concurrency,
        ..GeneratorOptions::new(
            TableFilter::schema(&postgres_config.schema).with_tables(cli.tables.clone()),
        )
    };

    let generator = Generator::new(introspector, descriptions, options);

    if let Some(path) = &cli.dump_schema {
        let count = generator.dump_schema(path).await?;
        info!("Dumped {} tables to {}", count, path.display());
        return Ok(());
    }

    if cli.dry_run {
        let model = generator.generate().await?;
        print!("{}", model.render()?);
        return Ok(());
    }

    let model = generator.generate().await?;
    let emitter = Emitter::new(&output_config.output_dir);
    if cli.backup_existing {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        emitter.backup_existing(&stamp).map_err(|e| {
            error!("Failed to back up existing files: {}", e);
            e
        })?;
    }
    generator.write(&emitter, &model, cli.summary)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Generation failed: {}", e);
        process::exit(1);
    }
}
