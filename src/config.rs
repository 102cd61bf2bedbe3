//! Config module contains the top-level config for the app.
use std::env;

use config_crate::{Config as RawConfig, ConfigError, Environment, File};

/// Basic settings - HTTP binding address and the public url used in form links
#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
    pub thread_count: usize,
    pub public_url: String,
}

/// Which collaborator holds the coupon and claim tables
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Remote,
    Local,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Ledger {
    pub backend: LedgerBackend,
    /// Endpoint of the spreadsheet api, required for the remote backend
    pub url: Option<String>,
    pub coupons_table: String,
    pub claims_table: String,
    /// JSON file backing the local backend, kept in memory only when absent
    pub local_path: Option<String>,
    pub conflict_retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Coupons {
    pub default_reward: u32,
    pub claims_utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Logging {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
}

/// Global app config
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
    pub ledger: Ledger,
    pub coupons: Coupons,
    pub logging: Option<Logging>,
    pub sentry: Option<SentryConfig>,
}

impl Config {
    /// Creates config from base.toml, which are overwritten by <env>.toml, where env is one of development,
    /// test, production. After that it could be overwritten by env variables like COUPONS__LEDGER__URL
    /// (this will override `ledger.url` field in config).
    pub fn new() -> Result<Self, ConfigError> {
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Config::with_env(env)
    }

    pub fn with_env(env: impl Into<String>) -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();

        s.merge(File::with_name("config/base"))?;
        s.merge(File::with_name(&format!("config/{}", env.into())).required(false))?;
        s.merge(Environment::with_prefix("COUPONS").separator("__"))?;
        s.try_into()
    }
}
