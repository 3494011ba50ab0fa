//! Application ports
//!
//! Traits for the collaborators the donation core drives but does not own:
//! the wallet, chain reads, the payout directory and the notice surface.
//! `infrastructure` provides ethers-backed implementations.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use crate::domain::entities::{TokenBalance, TransferReceipt};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, Notice, TxHash, U256};

/// Reads token balances for an owner over several chains at once.
///
/// Chains that could not be read are left out of the result.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn get_all_tokens_across_chains(
        &self,
        owner: Address,
        chain_ids: &[u64],
    ) -> Result<Vec<TokenBalance>, DonationError>;
}

/// Reads ERC-20 allowances
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AllowanceReader: Send + Sync {
    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, DonationError>;
}

/// Confirms the wallet client really points at the expected chain
#[async_trait]
pub trait ChainSyncValidator: Send + Sync {
    async fn validate_chain_sync(&self, expected_chain_id: u64) -> Result<bool, DonationError>;
}

/// Looks up where a project receives donations on a chain
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PayoutAddressResolver: Send + Sync {
    async fn resolve_payout_address(
        &self,
        project_id: &str,
        chain_id: u64,
    ) -> Result<Option<String>, DonationError>;
}

/// Toast surface of the presentation layer
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// One entry of a batched donation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDonation {
    pub recipient: Address,
    /// Zero address for the native asset
    pub token: Address,
    pub amount: U256,
}

/// A state-changing call the wallet signs and submits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    Approve {
        chain_id: u64,
        token: Address,
        spender: Address,
        amount: U256,
    },
    NativeTransfer {
        chain_id: u64,
        to: Address,
        amount: U256,
    },
    TokenTransfer {
        chain_id: u64,
        token: Address,
        to: Address,
        amount: U256,
    },
    BatchDonate {
        chain_id: u64,
        contract: Address,
        donations: Vec<BatchDonation>,
        value: U256,
    },
}

impl ContractCall {
    pub fn chain_id(&self) -> u64 {
        match self {
            ContractCall::Approve { chain_id, .. }
            | ContractCall::NativeTransfer { chain_id, .. }
            | ContractCall::TokenTransfer { chain_id, .. }
            | ContractCall::BatchDonate { chain_id, .. } => *chain_id,
        }
    }
}

/// The connected wallet
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn account(&self) -> Result<Option<Address>, DonationError>;

    async fn chain_id(&self) -> Result<u64, DonationError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), DonationError>;

    async fn write_contract(&self, call: ContractCall) -> Result<TxHash, DonationError>;

    async fn wait_for_transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> Result<TransferReceipt, DonationError>;
}
