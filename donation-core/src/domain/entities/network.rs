//! Network entity for the donation core

use serde::{Serialize, Deserialize};
use crate::shared::constants::{NetworkConfig, SUPPORTED_NETWORKS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SupportedChain {
    pub chain_id: u64,
    pub name: String,
    pub explorer: String,
    pub native_currency: String,
}

impl From<&NetworkConfig> for SupportedChain {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            name: config.name.to_string(),
            explorer: config.block_explorer.to_string(),
            native_currency: config.native_currency.to_string(),
        }
    }
}

pub fn supported_chains() -> Vec<SupportedChain> {
    SUPPORTED_NETWORKS.iter().map(|n| SupportedChain::from(*n)).collect()
}

/// Human readable chain name, falling back to the numeric id
pub fn chain_name(chain_id: u64) -> String {
    SUPPORTED_NETWORKS
        .iter()
        .find(|n| n.chain_id == chain_id)
        .map(|n| n.name.to_string())
        .unwrap_or_else(|| format!("Chain {}", chain_id))
}
