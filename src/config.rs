use std::collections::BTreeMap;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::db::engine::EngineOptions;
use crate::error::StorefrontError;

/// Environment prefix for every configuration key, e.g. `STOREFRONT_DATABASE_URL`.
pub const ENV_PREFIX: &str = "STOREFRONT_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project_name: String,
    pub database_url: String,
    pub database_echo: bool,
    pub database_pool_size: u32,
    pub database_acquire_timeout_secs: u64,
    pub database_close_timeout_secs: u64,
    /// Passed to the driver untouched (SQLite pragmas).
    pub database_pragmas: BTreeMap<String, String>,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            project_name: "storefront".to_string(),
            database_url: String::new(),
            database_echo: engine.echo,
            database_pool_size: engine.pool_size,
            database_acquire_timeout_secs: engine.acquire_timeout.as_secs(),
            database_close_timeout_secs: engine.close_timeout.as_secs(),
            database_pragmas: BTreeMap::new(),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `STOREFRONT_*` environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_env() -> Result<Self, StorefrontError> {
        let cfg: Config = Self::figment().extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), StorefrontError> {
        if self.database_url.trim().is_empty() {
            return Err(StorefrontError::MissingDatabaseUrl);
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            pool_size: self.database_pool_size.max(1),
            echo: self.database_echo,
            acquire_timeout: Duration::from_secs(self.database_acquire_timeout_secs),
            close_timeout: Duration::from_secs(self.database_close_timeout_secs),
            driver_options: self.database_pragmas.clone(),
        }
    }
}
