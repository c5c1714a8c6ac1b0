//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Bridge identity and dispatch configuration.
    pub bridge: BridgeConfig,
    /// Federation configuration.
    #[serde(default)]
    pub federation: FederationConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration (job queue backend).
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
}

/// Bridge identity and protocol-dispatch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Root domain the bridge serves, e.g. `bridge.example`. Reserved
    /// subdomains of this domain map to registered protocols.
    pub domain: String,
    /// Hosts that address the bridge as a whole and resolve to the
    /// configured default ("federation") protocol, when one is passed.
    #[serde(default = "default_fed_hosts")]
    pub fed_hosts: Vec<String>,
    /// Fixed priority order for remote ownership probing: structured
    /// fetch first, generic document fetch second.
    #[serde(default = "default_probe_order")]
    pub probe_order: Vec<String>,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Whether outbound federation is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// User agent for outbound requests.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: None,
        }
    }
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_fed_hosts() -> Vec<String> {
    vec!["localhost".to_string()]
}

fn default_probe_order() -> Vec<String> {
    vec!["activitypub".to_string(), "web".to_string()]
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `CROSSFED_ENV`)
    /// 3. Environment variables with `CROSSFED__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("CROSSFED_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CROSSFED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CROSSFED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
