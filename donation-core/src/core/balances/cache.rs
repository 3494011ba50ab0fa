//! Shared TTL balance cache
//!
//! One `BalanceCache` is created by the application and handed (cloned) to
//! every consumer; clones share the same entries. Entries older than the TTL
//! are never served.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use crate::domain::entities::{CachedBalance, SupportedToken};

#[derive(Debug, Clone)]
struct CacheEntry {
    chain_id: u64,
    cached: CachedBalance,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    chains_fetched_at: HashMap<u64, Instant>,
}

#[derive(Debug, Clone)]
pub struct BalanceCache {
    ttl: Duration,
    state: Arc<RwLock<CacheState>>,
}

impl BalanceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Balance for `SYMBOL-chainId`, if present and within the TTL
    pub async fn get(&self, key: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| entry.cached.is_valid(self.ttl))
            .map(|entry| entry.cached.balance.clone())
    }

    /// Store a balance; the last writer wins
    pub async fn put(&self, token: &SupportedToken, balance: &str) {
        let mut state = self.state.write().await;
        state.entries.insert(
            token.key(),
            CacheEntry {
                chain_id: token.chain_id,
                cached: CachedBalance::new(balance),
            },
        );
    }

    /// Record that a full fetch for `chain_id` just completed
    pub async fn mark_chain_fetched(&self, chain_id: u64) {
        let mut state = self.state.write().await;
        state.chains_fetched_at.insert(chain_id, Instant::now());
    }

    pub async fn is_chain_fresh(&self, chain_id: u64) -> bool {
        let state = self.state.read().await;
        state
            .chains_fetched_at
            .get(&chain_id)
            .map(|fetched_at| fetched_at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// All valid entries belonging to any of `chain_ids`
    pub async fn valid_entries_for_chains(&self, chain_ids: &[u64]) -> HashMap<String, String> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|(_, entry)| chain_ids.contains(&entry.chain_id) && entry.cached.is_valid(self.ttl))
            .map(|(key, entry)| (key.clone(), entry.cached.balance.clone()))
            .collect()
    }

    /// Drop expired entries, returning how many were removed
    pub async fn evict_stale(&self) -> usize {
        let ttl = self.ttl;
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.cached.is_valid(ttl));
        state.chains_fetched_at.retain(|_, fetched_at| fetched_at.elapsed() < ttl);
        before - state.entries.len()
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.chains_fetched_at.clear();
        log::debug!("Balance cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
