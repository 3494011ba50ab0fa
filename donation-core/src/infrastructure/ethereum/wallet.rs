//! Local-key wallet client
//!
//! Signs with a `LocalWallet` through `SignerMiddleware` on the provider of
//! the active chain. "Switching" a local key is just changing which provider
//! is active.

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::U64;
use tokio::sync::RwLock;
use crate::application::ports::{ContractCall, WalletClient};
use crate::domain::entities::{ReceiptStatus, TransferReceipt};
use crate::infrastructure::ethereum::{calldata, ChainProviders};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, TxHash};

pub struct EthersWalletClient {
    signer: LocalWallet,
    providers: ChainProviders,
    active_chain: RwLock<u64>,
}

impl EthersWalletClient {
    pub fn new(signer: LocalWallet, providers: ChainProviders, chain_id: u64) -> Result<Self, DonationError> {
        if !providers.contains(chain_id) {
            return Err(DonationError::config(format!("No RPC endpoint configured for chain {}", chain_id)));
        }
        Ok(Self {
            signer,
            providers,
            active_chain: RwLock::new(chain_id),
        })
    }

    pub fn from_private_key(private_key: &str, providers: ChainProviders, chain_id: u64) -> Result<Self, DonationError> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = key
            .parse::<LocalWallet>()
            .map_err(|e| DonationError::config(format!("Invalid private key: {}", e)))?;
        Self::new(signer, providers, chain_id)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub async fn active_chain(&self) -> u64 {
        *self.active_chain.read().await
    }

    pub async fn active_provider(&self) -> Result<Provider<Http>, DonationError> {
        self.providers.get(self.active_chain().await)
    }
}

#[async_trait]
impl WalletClient for EthersWalletClient {
    async fn account(&self) -> Result<Option<Address>, DonationError> {
        Ok(Some(self.signer.address()))
    }

    async fn chain_id(&self) -> Result<u64, DonationError> {
        Ok(self.active_chain().await)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), DonationError> {
        if !self.providers.contains(chain_id) {
            return Err(DonationError::config(format!("No RPC endpoint configured for chain {}", chain_id)));
        }
        let mut active = self.active_chain.write().await;
        if *active != chain_id {
            log::info!("Wallet switched from chain {} to {}", *active, chain_id);
            *active = chain_id;
        }
        Ok(())
    }

    async fn write_contract(&self, call: ContractCall) -> Result<TxHash, DonationError> {
        let chain_id = call.chain_id();
        let active = self.active_chain().await;
        if chain_id != active {
            return Err(DonationError::chain_mismatch(chain_id, active));
        }

        let provider = self.providers.get(chain_id)?;
        let client = SignerMiddleware::new(provider, self.signer.clone().with_chain_id(chain_id));
        let request = calldata::transaction_request(&call).from(self.signer.address());
        let pending = client.send_transaction(request, None).await.map_err(|e| {
            DonationError::network(format!("Failed to submit transaction on chain {}: {}", chain_id, e))
        })?;
        let tx_hash = pending.tx_hash();
        log::debug!("Transaction {:?} sent on chain {}", tx_hash, chain_id);
        Ok(tx_hash)
    }

    async fn wait_for_transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> Result<TransferReceipt, DonationError> {
        let provider = self.providers.get(chain_id)?;
        let receipt = PendingTransaction::new(tx_hash, &provider)
            .await?
            .ok_or_else(|| DonationError::network(format!("Transaction {:?} was dropped", tx_hash)))?;

        let status = if receipt.status == Some(U64::from(1u64)) {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Reverted
        };
        Ok(TransferReceipt {
            transaction_hash: receipt.transaction_hash,
            status,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        })
    }
}
