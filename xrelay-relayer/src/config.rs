//! Relayer configuration.
//!
//! Loaded from an optional TOML file (`XRELAY_CONFIG`, default
//! `xrelay.toml`) with `XRELAY__`-prefixed environment variables layered on
//! top, e.g. `XRELAY__QUEUE__WORKERS=8`.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use xrelay_types::RELAY_CHAIN_ID;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "xrelay.toml";

/// Relayer configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct RelayerConfig {
    pub relay: RelayConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Relay chain settings.
#[derive(Clone, Debug, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_chain_id")]
    pub chain_id: u64,
    /// Cross-chain manager contract emitting `makeProof` notifications.
    pub ccm_address: String,
    #[serde(default)]
    pub start_height: u64,
    #[serde(default = "default_listen_check_secs")]
    pub listen_check_secs: u64,
}

/// One monitored source chain.
#[derive(Clone, Debug, Deserialize)]
pub struct SourceConfig {
    pub chain_id: u64,
    pub name: String,
    /// Cross-chain manager contract.
    pub ccm_contract: String,
    /// Cross-chain data contract holding request storage.
    pub ccd_contract: String,
    #[serde(default)]
    pub start_height: u64,
    #[serde(default = "default_listen_check_secs")]
    pub listen_check_secs: u64,
    /// Blocks a request must be buried under before it is proven.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Blocks to stay behind the tip when scanning.
    #[serde(default)]
    pub defer: u64,
}

/// Composition queue and retry policy.
#[derive(Clone, Debug, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_millis")]
    pub base_backoff_millis: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Treat `NotFound` as not-yet-indexed data and retry it.
    #[serde(default)]
    pub retry_not_found: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            max_retries: default_max_retries(),
            base_backoff_millis: default_base_backoff_millis(),
            max_backoff_secs: default_max_backoff_secs(),
            workers: default_workers(),
            retry_not_found: false,
        }
    }
}

impl QueueConfig {
    /// Delay before retry number `retries` (1-based), doubling from the base
    /// and capped at `max_backoff_secs`.
    pub fn backoff(&self, retries: u32) -> Duration {
        let exp = retries.saturating_sub(1).min(20);
        let millis = self.base_backoff_millis.saturating_mul(1u64 << exp);
        Duration::from_millis(millis).min(Duration::from_secs(self.max_backoff_secs))
    }
}

fn default_relay_chain_id() -> u64 {
    RELAY_CHAIN_ID
}

fn default_listen_check_secs() -> u64 {
    1
}

fn default_confirmations() -> u64 {
    3
}

fn default_capacity() -> usize {
    1000
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_backoff_millis() -> u64 {
    500
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_workers() -> usize {
    4
}

impl RelayerConfig {
    /// Load configuration from `.env`, the config file and the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = env::var("XRELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::with_name(path).required(false))
            // Values stay strings; numeric fields are parsed on deserialize.
            .add_source(Environment::with_prefix("XRELAY").separator("__"))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path))?
            .try_deserialize()
            .context("invalid relayer configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.workers == 0 {
            bail!("queue.workers must be at least 1");
        }
        if self.queue.capacity == 0 {
            bail!("queue.capacity must be at least 1");
        }
        if self.relay.ccm_address.is_empty() {
            bail!("relay.ccm_address must be set");
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.chain_id == self.relay.chain_id {
                bail!(
                    "source {} uses the relay chain id {}",
                    source.name,
                    source.chain_id
                );
            }
            if !seen.insert(source.chain_id) {
                bail!("duplicate source chain id {}", source.chain_id);
            }
        }
        Ok(())
    }
}
