use crate::patch::Substitution;
use flagstore::config::FlagStoreConfig;
use serde::Deserialize;
use smokecheck::llm::ModelProbe;
use std::fs::File;

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug)]
pub struct SmokeConfig {
    /// Base URL of the LLM gateway.
    pub gateway_url: String,
    /// Base URL of the OAuth connector service.
    pub connector_url: String,
    #[serde(default)]
    pub models: Vec<ModelProbe>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PatchConfig {
    pub substitutions: Vec<Substitution>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub logging: Option<LoggingConfig>,
    pub metrics: Option<MetricsConfig>,
    pub flag_store: FlagStoreConfig,
    pub smoke: Option<SmokeConfig>,
    pub patch: Option<PatchConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}
