//! Donation Core
//!
//! Cross-chain donation pipeline: balance aggregation across EVM chains,
//! cart validation, ERC-20 approvals and sequential multi-chain transfer
//! execution.
//!
//! ## Architecture
//!
//! - **Core**: balance cache and aggregator, validator, approval checker,
//!   transfer executor
//! - **Domain**: tokens, chains, payments, transfer records
//! - **Application**: ports for the wallet and chain reads, checkout use case
//! - **Infrastructure**: configuration, logging, ethers adapters
//! - **Shared**: error type, constants, utilities
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use donation_core::{BalanceCache, ChainProviders, CrossChainBalances, EthersBalanceSource, LogNotifier};
//!
//! # fn main() -> Result<(), donation_core::DonationError> {
//! let config = donation_core::init()?;
//! let settings = config.balance_settings();
//! let balances = CrossChainBalances::new(
//!     Arc::new(EthersBalanceSource::new(ChainProviders::from_config(&config)?)),
//!     BalanceCache::new(settings.cache_ttl),
//!     Arc::new(LogNotifier::new()),
//!     settings,
//! );
//! # let _ = balances;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod test_support;

pub use crate::core::{
    validate_payments, ApprovalChecker, ApprovalOutcome, ApprovalRequirement, BalanceCache, BalanceFetchSettings,
    BalanceRequest, BalanceSnapshot, CrossChainBalances, DonationContracts, ExecutionReport,
    TransferExecutor, ValidationResult,
};
pub use crate::core::balances::{FetchOutcome, RetryOutcome, RetryPolicy, RetryState};
pub use application::ports::{
    AllowanceReader, BalanceSource, BatchDonation, ChainSyncValidator, ContractCall, Notifier,
    PayoutAddressResolver, WalletClient,
};
pub use application::use_cases::DonationCheckout;
pub use domain::entities::{
    find_token, supported_chains, supported_tokens, BalanceError, BalanceErrorKind, DonationPayment,
    SupportedChain, SupportedToken, TokenBalance, TransferReceipt, TransferRecord, TransferStatus,
};
pub use infrastructure::{
    init_logging, ChainProviders, DonationConfig, EthersAllowanceReader, EthersBalanceSource, EthersChainSync,
    EthersWalletClient, LogNotifier, StaticPayoutDirectory,
};
pub use shared::error::DonationError;
pub use shared::types::{Address, Notice, NoticeLevel, TxHash, U256};

pub use shared::constants::{NAME, VERSION};

/// Load `.env` and configuration, validate it and install the logger.
pub fn init() -> Result<DonationConfig, DonationError> {
    let config = DonationConfig::load()?;
    config.validate()?;
    init_logging(&config.log_level);
    log::info!("{} {} initialised with {} chain(s)", NAME, VERSION, config.chains.len());
    Ok(config)
}
