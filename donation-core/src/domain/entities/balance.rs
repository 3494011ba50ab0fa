//! Balance entities

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use crate::domain::entities::token::SupportedToken;
use crate::shared::types::U256;
use crate::shared::utils::format_amount;

/// One token balance as reported by a balance source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: SupportedToken,
    pub raw_balance: U256,
    pub formatted_balance: String,
}

impl TokenBalance {
    pub fn new(token: SupportedToken, raw_balance: U256) -> Self {
        let formatted_balance = format_amount(raw_balance, token.decimals);
        Self {
            token,
            raw_balance,
            formatted_balance,
        }
    }
}

/// Cache entry; only trusted while younger than the TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBalance {
    pub balance: String,
    pub fetched_at: Instant,
}

impl CachedBalance {
    pub fn new(balance: impl Into<String>) -> Self {
        Self {
            balance: balance.into(),
            fetched_at: Instant::now(),
        }
    }

    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalanceErrorKind {
    Timeout,
    NetworkFailure,
    RetriesExhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceError {
    pub kind: BalanceErrorKind,
    pub message: String,
    pub chain_ids: Vec<u64>,
    pub can_retry: bool,
}

impl BalanceError {
    pub fn timeout(chain_ids: Vec<u64>) -> Self {
        Self {
            kind: BalanceErrorKind::Timeout,
            message: "Balance fetch timed out".to_string(),
            chain_ids,
            can_retry: true,
        }
    }

    pub fn network(message: impl Into<String>, chain_ids: Vec<u64>) -> Self {
        Self {
            kind: BalanceErrorKind::NetworkFailure,
            message: message.into(),
            chain_ids,
            can_retry: true,
        }
    }

    pub fn retries_exhausted(attempts: u32, chain_ids: Vec<u64>) -> Self {
        Self {
            kind: BalanceErrorKind::RetriesExhausted,
            message: format!("Maximum retry attempts reached ({})", attempts),
            chain_ids,
            can_retry: false,
        }
    }
}
