//! Store configuration
//!
//! Read from a TOML file, then overridden from the environment:
//!
//! | variable                      | field            |
//! |-------------------------------|------------------|
//! | `RUSTY_PRICES_DB`             | `database_path`  |
//! | `RUSTY_PRICES_POOL_SIZE`      | `pool_size`      |
//! | `RUSTY_PRICES_MISSING_POLICY` | `missing_policy` |
//!
//! ```toml
//! database_path = "/var/lib/rusty-prices/prices.db"
//! pool_size = 8
//! missing_policy = "zero"
//! ```

use crate::error::{PriceStoreError, Result};
use crate::sanitize::MissingPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "RUSTY_PRICES_DB";
pub const ENV_POOL_SIZE: &str = "RUSTY_PRICES_POOL_SIZE";
pub const ENV_MISSING_POLICY: &str = "RUSTY_PRICES_MISSING_POLICY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default)]
    pub missing_policy: MissingPolicy,
}

/// `~/.rusty-prices`, or `./.rusty-prices` without a home directory
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rusty-prices")
}

fn default_database_path() -> PathBuf {
    default_home().join("prices.db")
}

fn default_pool_size() -> u32 {
    4
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
            missing_policy: MissingPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(contents)
            .map_err(|e| PriceStoreError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from `~/.rusty-prices/config.toml` when it exists,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&fs::read_to_string(path)?)?,
            None => {
                let default_path = default_home().join("config.toml");
                if default_path.exists() {
                    Self::from_toml_str(&fs::read_to_string(default_path)?)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`StoreConfig::load`])
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(path) = var(ENV_DB) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(size) = var(ENV_POOL_SIZE) {
            self.pool_size = size.parse().map_err(|_| {
                PriceStoreError::Config(format!("Invalid {}: {}", ENV_POOL_SIZE, size))
            })?;
        }
        if let Some(policy) = var(ENV_MISSING_POLICY) {
            self.missing_policy = MissingPolicy::parse(&policy).ok_or_else(|| {
                PriceStoreError::Config(format!("Invalid {}: {}", ENV_MISSING_POLICY, policy))
            })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(PriceStoreError::Config(
                "pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
