//! Ethereum adapters
//!
//! ethers-backed implementations of the chain-facing ports. One HTTP
//! provider per configured chain.

pub mod calldata;
pub mod balance_source;
pub mod allowance;
pub mod wallet;
pub mod chain_sync;

use std::collections::HashMap;
use ethers::providers::{Http, Provider};
use crate::infrastructure::config::DonationConfig;
use crate::shared::error::DonationError;

pub use allowance::EthersAllowanceReader;
pub use balance_source::EthersBalanceSource;
pub use chain_sync::EthersChainSync;
pub use wallet::EthersWalletClient;

#[derive(Debug, Clone, Default)]
pub struct ChainProviders {
    providers: HashMap<u64, Provider<Http>>,
}

impl ChainProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DonationConfig) -> Result<Self, DonationError> {
        let mut providers = Self::new();
        for chain in &config.chains {
            providers.insert(chain.chain_id, &chain.rpc_url)?;
        }
        Ok(providers)
    }

    pub fn insert(&mut self, chain_id: u64, rpc_url: &str) -> Result<(), DonationError> {
        let provider = Provider::<Http>::try_from(rpc_url).map_err(|e| {
            DonationError::config(format!("Invalid RPC URL for chain {}: {}", chain_id, e))
        })?;
        self.providers.insert(chain_id, provider);
        Ok(())
    }

    pub fn get(&self, chain_id: u64) -> Result<Provider<Http>, DonationError> {
        self.providers
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| DonationError::config(format!("No RPC endpoint configured for chain {}", chain_id)))
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.providers.contains_key(&chain_id)
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut chain_ids: Vec<u64> = self.providers.keys().copied().collect();
        chain_ids.sort_unstable();
        chain_ids
    }
}
