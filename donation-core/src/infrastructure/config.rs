//! Configuration loading
//!
//! Layers, lowest priority first: built-in defaults, an optional config
//! file, then `DONATION_CORE_*` environment variables (`__` separates
//! nested keys, e.g. `DONATION_CORE_BALANCES__FETCH_TIMEOUT_MS`). A `.env`
//! file is read first when present.

use std::path::{Path, PathBuf};
use std::time::Duration;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use crate::core::balances::{BalanceFetchSettings, RetryPolicy};
use crate::core::transfers::DonationContracts;
use crate::shared::constants::{
    BALANCE_CACHE_TTL_MS, BALANCE_FETCH_TIMEOUT_MS, ENV_PREFIX, LOG_LEVEL, MAX_RETRY_ATTEMPTS,
    RETRY_DELAYS_MS, SLOW_FETCH_THRESHOLD_MS, SUPPORTED_NETWORKS,
};
use crate::shared::error::DonationError;
use crate::shared::utils::parse_address;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "DONATION_CORE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BalanceConfig {
    pub cache_ttl_ms: u64,
    pub slow_fetch_threshold_ms: u64,
    pub fetch_timeout_ms: u64,
    pub retry_delays_ms: Vec<u64>,
    pub max_retry_attempts: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: BALANCE_CACHE_TTL_MS,
            slow_fetch_threshold_ms: SLOW_FETCH_THRESHOLD_MS,
            fetch_timeout_ms: BALANCE_FETCH_TIMEOUT_MS,
            retry_delays_ms: RETRY_DELAYS_MS.to_vec(),
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
        }
    }
}

impl From<&BalanceConfig> for BalanceFetchSettings {
    fn from(config: &BalanceConfig) -> Self {
        Self {
            cache_ttl: Duration::from_millis(config.cache_ttl_ms),
            slow_threshold: Duration::from_millis(config.slow_fetch_threshold_ms),
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            retry_policy: RetryPolicy::new(
                config.retry_delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
                config.max_retry_attempts,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer: String,
    /// Batch donation contract, also the spender for ERC-20 approvals
    #[serde(default)]
    pub donation_contract: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DonationConfig {
    pub log_level: String,
    pub balances: BalanceConfig,
    pub chains: Vec<ChainConfig>,
}

impl Default for DonationConfig {
    fn default() -> Self {
        Self {
            log_level: LOG_LEVEL.to_string(),
            balances: BalanceConfig::default(),
            chains: SUPPORTED_NETWORKS
                .iter()
                .map(|network| ChainConfig {
                    chain_id: network.chain_id,
                    name: network.name.to_string(),
                    rpc_url: network.rpc_url.to_string(),
                    explorer: network.block_explorer.to_string(),
                    donation_contract: None,
                })
                .collect(),
        }
    }
}

impl DonationConfig {
    /// Load from `.env`, the file named by `DONATION_CORE_CONFIG` and the
    /// environment.
    pub fn load() -> Result<Self, DonationError> {
        dotenv::dotenv().ok();
        let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self, DonationError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            log::debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("balances.retry_delays_ms"),
            )
            .build()?;
        let config: DonationConfig = settings.try_deserialize()?;
        log::debug!("Loaded configuration for {} chain(s)", config.chains.len());
        Ok(config)
    }

    /// All problems at once, joined into one `Config` error
    pub fn validate(&self) -> Result<(), DonationError> {
        let mut errors = Vec::new();
        let balances = &self.balances;

        if balances.cache_ttl_ms == 0 {
            errors.push("balances.cache_ttl_ms must be greater than zero".to_string());
        }
        if balances.slow_fetch_threshold_ms >= balances.fetch_timeout_ms {
            errors.push(format!(
                "balances.slow_fetch_threshold_ms ({}) must be shorter than balances.fetch_timeout_ms ({})",
                balances.slow_fetch_threshold_ms, balances.fetch_timeout_ms
            ));
        }
        if balances.retry_delays_ms.is_empty() {
            errors.push("balances.retry_delays_ms must not be empty".to_string());
        }
        if balances.max_retry_attempts == 0 {
            errors.push("balances.max_retry_attempts must be at least 1".to_string());
        }

        let mut seen = Vec::new();
        for chain in &self.chains {
            if seen.contains(&chain.chain_id) {
                errors.push(format!("Chain {} is configured twice", chain.chain_id));
            }
            seen.push(chain.chain_id);
            if chain.rpc_url.trim().is_empty() {
                errors.push(format!("Chain {} has no rpc_url", chain.chain_id));
            }
            if let Some(contract) = &chain.donation_contract {
                if parse_address(contract).is_err() {
                    errors.push(format!(
                        "Chain {} has an invalid donation_contract: {}",
                        chain.chain_id, contract
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DonationError::config(errors.join(", ")))
        }
    }

    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|chain| chain.chain_id == chain_id)
    }

    pub fn balance_settings(&self) -> BalanceFetchSettings {
        BalanceFetchSettings::from(&self.balances)
    }

    pub fn donation_contracts(&self) -> Result<DonationContracts, DonationError> {
        let mut contracts = DonationContracts::new();
        for chain in &self.chains {
            if let Some(contract) = &chain.donation_contract {
                contracts.insert(chain.chain_id, parse_address(contract)?);
            }
        }
        Ok(contracts)
    }
}
