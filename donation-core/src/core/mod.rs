//! Core donation functionality
//!
//! Balance aggregation and caching, cart validation, ERC-20 approvals and
//! transfer execution.

pub mod balances;
pub mod validation;
pub mod approvals;
pub mod transfers;

pub use balances::{BalanceCache, BalanceFetchSettings, BalanceRequest, BalanceSnapshot, CrossChainBalances};
pub use validation::{validate_payments, ValidationResult};
pub use approvals::{ApprovalChecker, ApprovalOutcome, ApprovalRequirement};
pub use transfers::{DonationContracts, ExecutionReport, TransferExecutor};
