//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The feed credential is referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::strategy::filter::BetFilter;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub feed: FeedConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    pub dashboard: DashboardConfig,
    /// Seconds between pipeline runs; 0 runs once and exits.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

/// Where odds come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Api,
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub source: FeedSource,
    pub base_url: String,
    pub sport: String,
    pub regions: String,
    pub markets: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Saved payload for `source = "file"`.
    #[serde(default)]
    pub payload_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    pub min_ev: i32,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    pub top_n: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_ev: 0,
            team: None,
            market: None,
            top_n: 5,
        }
    }
}

impl FilterConfig {
    pub fn to_filter(&self) -> BetFilter {
        BetFilter::new(self.min_ev, self.team.as_deref(), self.market.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    pub path: String,
    /// Append only bets that pass the filter; `false` appends every bet.
    pub record_filtered_only: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: crate::storage::csv::DEFAULT_LEDGER_FILE.to_string(),
            record_filtered_only: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
