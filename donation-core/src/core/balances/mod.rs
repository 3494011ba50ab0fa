//! Cross-chain balance tracking
//!
//! `cache` holds the shared TTL cache, `aggregator` keeps the per-cart view
//! on top of it and `retry` is the backoff state machine it uses.

pub mod cache;
pub mod aggregator;
pub mod retry;

pub use cache::BalanceCache;
pub use aggregator::{
    BalanceFetchSettings, BalanceRequest, BalanceSnapshot, CrossChainBalances, FetchOutcome,
    RetryOutcome,
};
pub use retry::{RetryEvent, RetryPolicy, RetryState};
