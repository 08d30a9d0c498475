use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub cloud: CloudConfig,
    pub currency: CurrencyConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    /// Used when no key has been saved to the local store.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurrencyConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_sources")]
    pub default_sources: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<String> {
    ["aeroplan", "united", "alaska", "american", "virginatlantic", "flyingblue", "qantas"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SCOUT_BACKEND__API_KEY=...`
            .add_source(config::Environment::with_prefix("SCOUT").separator("__"));

        Self::build(builder)
    }

    pub fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}
