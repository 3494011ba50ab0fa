//! Infrastructure layer - concrete adapters
//!
//! Configuration loading, logging setup, ethers-backed chain access and the
//! in-process implementations of the notice and payout ports.

pub mod config;
pub mod logging;
pub mod ethereum;
pub mod notifications;
pub mod payouts;

pub use self::config::{BalanceConfig, ChainConfig, DonationConfig};
pub use logging::init_logging;
pub use ethereum::{ChainProviders, EthersAllowanceReader, EthersBalanceSource, EthersChainSync, EthersWalletClient};
pub use notifications::LogNotifier;
pub use payouts::StaticPayoutDirectory;
