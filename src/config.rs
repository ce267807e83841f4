use envconfig::Envconfig;
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envconfig::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Envconfig, Clone)]
pub struct PostgresConfig {
    #[envconfig(from = "POSTGRES_HOST", default = "localhost")]
    pub host: String,
    #[envconfig(from = "POSTGRES_PORT", default = "5432")]
    pub port: u16,
    #[envconfig(from = "POSTGRES_DB", default = "postgres")]
    pub dbname: String,
    #[envconfig(from = "POSTGRES_USER", default = "postgres")]
    pub user: String,
    #[envconfig(from = "POSTGRES_PASSWORD", default = "postgres")]
    pub password: String,
    #[envconfig(from = "POSTGRES_SCHEMA", default = "public")]
    pub schema: String,
}

impl PostgresConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Self::init_from_env()?;
        debug!(
            "PostgresConfig loaded: user={}, host={}, port={}, dbname={}, schema={}",
            config.user, config.host, config.port, config.dbname, config.schema
        );
        Ok(config)
    }
}

#[derive(Envconfig, Clone)]
pub struct LlmConfig {
    #[envconfig(from = "OPENAI_API_KEY")]
    pub api_key: Option<String>,
    #[envconfig(from = "LLM_BASE_URL", default = "https://api.openai.com/v1")]
    pub base_url: String,
    #[envconfig(from = "LLM_MODEL", default = "gpt-4o-mini")]
    pub model: String,
    #[envconfig(from = "LLM_TIMEOUT_SECS", default = "30")]
    pub timeout_secs: u64,
    #[envconfig(from = "LLM_CONCURRENCY", default = "4")]
    pub concurrency: usize,
    #[envconfig(from = "LLM_SAMPLE_ROWS", default = "3")]
    pub sample_rows: usize,
}

impl LlmConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Self::init_from_env()?;
        if config.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "LLM_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        // never log the key itself
        debug!(
            "LlmConfig loaded: base_url={}, model={}, timeout_secs={}, concurrency={}, api_key_set={}",
            config.base_url,
            config.model,
            config.timeout_secs,
            config.concurrency,
            config.api_key.is_some()
        );
        Ok(config)
    }
}

#[derive(Envconfig, Clone)]
pub struct OutputConfig {
    #[envconfig(from = "OUTPUT_DIR", default = "model")]
    pub output_dir: String,
}

impl OutputConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Self::init_from_env()?;
        debug!("OutputConfig loaded: output_dir={}", config.output_dir);
        Ok(config)
    }
}
