//! Chain sync check against the RPC endpoint

use std::sync::Arc;
use async_trait::async_trait;
use ethers::providers::Middleware;
use crate::application::ports::ChainSyncValidator;
use crate::infrastructure::ethereum::EthersWalletClient;
use crate::shared::error::DonationError;
use crate::shared::types::U256;

/// Confirms the wallet's active provider really serves the expected chain
pub struct EthersChainSync {
    wallet: Arc<EthersWalletClient>,
}

impl EthersChainSync {
    pub fn new(wallet: Arc<EthersWalletClient>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl ChainSyncValidator for EthersChainSync {
    async fn validate_chain_sync(&self, expected_chain_id: u64) -> Result<bool, DonationError> {
        let active = self.wallet.active_chain().await;
        if active != expected_chain_id {
            log::debug!("Wallet is on chain {}, expected {}", active, expected_chain_id);
            return Ok(false);
        }

        let reported = self.wallet.active_provider().await?.get_chainid().await?;
        let in_sync = reported == U256::from(expected_chain_id);
        if !in_sync {
            log::warn!("RPC for chain {} reports chain id {}", expected_chain_id, reported);
        }
        Ok(in_sync)
    }
}
