//! Error handling for the donation core
//!
//! This module defines the error types used throughout the donation core.
//! Every failure has its own variant so callers never need to inspect
//! message text to tell a timeout from a revert.

use thiserror::Error;

/// Donation error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DonationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing payout address for project(s): {}", .project_ids.join(", "))]
    MissingPayoutAddress { project_ids: Vec<String> },

    #[error("Invalid payout address for project {project_id}: {address}")]
    InvalidPayoutAddress { project_id: String, address: String },

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Wallet is on chain {actual} but chain {expected} was expected")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("User rejected the request: {0}")]
    UserRejected(String),

    #[error("Transaction {tx_hash} reverted on chain {chain_id}")]
    Reverted { chain_id: u64, tx_hash: String },

    #[error("Maximum retry attempts reached ({attempts})")]
    RetriesExhausted { attempts: u32 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DonationError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn missing_payout_address(project_ids: Vec<String>) -> Self {
        Self::MissingPayoutAddress { project_ids }
    }

    pub fn invalid_payout_address(project_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self::InvalidPayoutAddress {
            project_id: project_id.into(),
            address: address.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn chain_mismatch(expected: u64, actual: u64) -> Self {
        Self::ChainMismatch { expected, actual }
    }

    /// Create a user rejection error
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::UserRejected(message.into())
    }

    pub fn reverted(chain_id: u64, tx_hash: impl Into<String>) -> Self {
        Self::Reverted {
            chain_id,
            tx_hash: tx_hash.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether re-running the same operation may succeed without user input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Network(_) | Self::ChainMismatch { .. }
        )
    }
}

impl From<ethers::providers::ProviderError> for DonationError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        Self::network(format!("Provider error: {}", err))
    }
}

impl From<config::ConfigError> for DonationError {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for DonationError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<tokio::task::JoinError> for DonationError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Task join error: {}", err))
    }
}
