//! Cross-chain balance aggregation
//!
//! Keeps a resilient view of the wallet's balances on every chain the cart
//! touches. Cached values are surfaced first, the aggregate fetch runs with a
//! slow-warning threshold and a hard timeout, and failures become a
//! `BalanceError` in the snapshot instead of an `Err`.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use crate::application::ports::{BalanceSource, Notifier};
use crate::core::balances::cache::BalanceCache;
use crate::core::balances::retry::{RetryEvent, RetryPolicy, RetryState};
use crate::domain::entities::{BalanceError, TokenBalance};
use crate::shared::constants::{
    BALANCE_CACHE_TTL_MS, BALANCE_FETCH_TIMEOUT_MS, MAX_RETRY_ATTEMPTS, RETRY_DELAYS_MS,
    SLOW_FETCH_THRESHOLD_MS,
};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, Notice};
use crate::shared::utils::token_key;

/// Timing knobs for balance fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceFetchSettings {
    pub cache_ttl: Duration,
    pub slow_threshold: Duration,
    pub fetch_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for BalanceFetchSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_millis(BALANCE_CACHE_TTL_MS),
            slow_threshold: Duration::from_millis(SLOW_FETCH_THRESHOLD_MS),
            fetch_timeout: Duration::from_millis(BALANCE_FETCH_TIMEOUT_MS),
            retry_policy: RetryPolicy::new(
                RETRY_DELAYS_MS.iter().map(|ms| Duration::from_millis(*ms)).collect(),
                MAX_RETRY_ATTEMPTS,
            ),
        }
    }
}

/// What the balances should currently cover
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceRequest {
    pub owner: Option<Address>,
    pub current_chain_id: Option<u64>,
    pub cart_chain_ids: Vec<u64>,
}

impl BalanceRequest {
    pub fn new(owner: Option<Address>, current_chain_id: Option<u64>, cart_chain_ids: Vec<u64>) -> Self {
        Self {
            owner,
            current_chain_id,
            cart_chain_ids,
        }
    }

    /// Connected chain plus cart chains, sorted and deduplicated
    pub fn chain_ids(&self) -> Vec<u64> {
        let set: BTreeSet<u64> = self
            .cart_chain_ids
            .iter()
            .copied()
            .chain(self.current_chain_id)
            .collect();
        set.into_iter().collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub balance_by_token_key: HashMap<String, String>,
    pub is_fetching: bool,
    pub is_slow_fetch: bool,
    pub balance_error: Option<BalanceError>,
    pub successful_chains: BTreeSet<u64>,
    pub failed_chains: BTreeSet<u64>,
    pub retry_state: RetryState,
    pub last_updated: Option<DateTime<Utc>>,
}

impl BalanceSnapshot {
    pub fn can_retry(&self) -> bool {
        self.retry_state.can_retry()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No wallet or no chains to look at
    Skipped,
    /// Every requested chain was fresh in the cache
    FromCache,
    Fetched,
    Failed,
    /// A newer request or a cancel superseded this one
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    NothingToRetry,
    Succeeded,
    Failed,
    Exhausted,
    Discarded,
}

enum Race {
    Completed(Result<Vec<TokenBalance>, DonationError>),
    TimedOut,
}

pub struct CrossChainBalances {
    source: Arc<dyn BalanceSource>,
    cache: BalanceCache,
    notifier: Arc<dyn Notifier>,
    settings: BalanceFetchSettings,
    state: RwLock<BalanceSnapshot>,
    last_request: RwLock<Option<BalanceRequest>>,
    generation: AtomicU64,
}

impl CrossChainBalances {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        cache: BalanceCache,
        notifier: Arc<dyn Notifier>,
        settings: BalanceFetchSettings,
    ) -> Self {
        Self {
            source,
            cache,
            notifier,
            settings,
            state: RwLock::new(BalanceSnapshot::default()),
            last_request: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    pub async fn snapshot(&self) -> BalanceSnapshot {
        self.state.read().await.clone()
    }

    pub async fn balance_by_token_key(&self) -> HashMap<String, String> {
        self.state.read().await.balance_by_token_key.clone()
    }

    pub async fn balance_error(&self) -> Option<BalanceError> {
        self.state.read().await.balance_error.clone()
    }

    pub async fn can_retry(&self) -> bool {
        self.state.read().await.can_retry()
    }

    pub async fn is_slow_fetch(&self) -> bool {
        self.state.read().await.is_slow_fetch
    }

    pub async fn get_balance(&self, symbol: &str, chain_id: u64) -> Option<String> {
        let key = token_key(symbol, chain_id);
        self.state.read().await.balance_by_token_key.get(&key).cloned()
    }

    /// React to a change of account, connected chain or cart chains.
    pub async fn refresh(&self, request: BalanceRequest) -> FetchOutcome {
        self.run_fetch(request, false).await
    }

    /// Retry the last request after the backoff delay, refetching every chain.
    pub async fn retry(&self) -> RetryOutcome {
        let request = match self.last_request.read().await.clone() {
            Some(request) => request,
            None => return RetryOutcome::NothingToRetry,
        };

        let next = {
            let mut state = self.state.write().await;
            if !state.retry_state.can_retry() {
                drop(state);
                self.notify_retries_exhausted();
                return RetryOutcome::Exhausted;
            }
            let next = self
                .settings
                .retry_policy
                .transition(state.retry_state, RetryEvent::RetryRequested);
            state.retry_state = next;
            if let RetryState::Exhausted { attempts } = next {
                let chain_ids = request.chain_ids();
                state.balance_error = Some(BalanceError::retries_exhausted(attempts, chain_ids));
                drop(state);
                self.notify_retries_exhausted();
                return RetryOutcome::Exhausted;
            }
            next
        };

        let delay = self.settings.retry_policy.delay_for(next.attempts());
        log::info!(
            "Retrying balance fetch (attempt {}/{}) in {:?}",
            next.attempts(),
            self.settings.retry_policy.max_attempts(),
            delay
        );
        tokio::time::sleep(delay).await;

        match self.run_fetch(request, true).await {
            FetchOutcome::Fetched | FetchOutcome::FromCache | FetchOutcome::Skipped => RetryOutcome::Succeeded,
            FetchOutcome::Discarded => RetryOutcome::Discarded,
            FetchOutcome::Failed => {
                if self.can_retry().await {
                    RetryOutcome::Failed
                } else {
                    RetryOutcome::Exhausted
                }
            }
        }
    }

    /// Stop applying results of whatever fetch is in flight.
    pub async fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        state.is_fetching = false;
        state.is_slow_fetch = false;
    }

    /// Balances pushed by the live subscription for the connected chain.
    pub async fn apply_live_balances(&self, chain_id: u64, balances: Vec<TokenBalance>) {
        let balances: Vec<TokenBalance> = balances
            .into_iter()
            .filter(|b| b.token.chain_id == chain_id)
            .collect();
        if balances.is_empty() {
            return;
        }

        for balance in &balances {
            self.cache.put(&balance.token, &balance.formatted_balance).await;
        }

        let mut state = self.state.write().await;
        for balance in balances {
            state
                .balance_by_token_key
                .insert(balance.token.key(), balance.formatted_balance);
        }
        state.successful_chains.insert(chain_id);
        state.failed_chains.remove(&chain_id);
        state.last_updated = Some(Utc::now());
    }

    async fn run_fetch(&self, request: BalanceRequest, force: bool) -> FetchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.write().await = Some(request.clone());

        let owner = match request.owner {
            Some(owner) => owner,
            None => {
                let mut state = self.state.write().await;
                let retry_state = state.retry_state;
                *state = BalanceSnapshot {
                    retry_state,
                    ..BalanceSnapshot::default()
                };
                return FetchOutcome::Skipped;
            }
        };

        let chain_ids = request.chain_ids();
        if chain_ids.is_empty() {
            return FetchOutcome::Skipped;
        }

        let evicted = self.cache.evict_stale().await;
        if evicted > 0 {
            log::debug!("Evicted {} stale balance(s) from the cache", evicted);
        }
        let cached = self.cache.valid_entries_for_chains(&chain_ids).await;
        let mut to_fetch = Vec::with_capacity(chain_ids.len());
        for chain_id in &chain_ids {
            if force || !self.cache.is_chain_fresh(*chain_id).await {
                to_fetch.push(*chain_id);
            }
        }

        {
            let mut state = self.state.write().await;
            state.balance_by_token_key.extend(cached);
            for chain_id in chain_ids.iter().filter(|c| !to_fetch.contains(*c)) {
                state.successful_chains.insert(*chain_id);
                state.failed_chains.remove(chain_id);
            }
            if to_fetch.is_empty() {
                state.is_fetching = false;
                state.is_slow_fetch = false;
                state.balance_error = None;
                state.retry_state = self
                    .settings
                    .retry_policy
                    .transition(state.retry_state, RetryEvent::FetchSucceeded);
                log::debug!("Balances for chains {:?} served from cache", chain_ids);
                return FetchOutcome::FromCache;
            }
            state.is_fetching = true;
            state.is_slow_fetch = false;
        }

        log::debug!("Fetching balances for {:?} on chains {:?}", owner, to_fetch);
        let race = self.race_fetch(owner, &to_fetch, generation).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Discarding superseded balance response for chains {:?}", to_fetch);
            return FetchOutcome::Discarded;
        }

        match race {
            Race::Completed(Ok(balances)) => {
                self.apply_fetched(&to_fetch, balances).await;
                FetchOutcome::Fetched
            }
            Race::Completed(Err(err)) => {
                log::warn!("Balance fetch failed for chains {:?}: {}", to_fetch, err);
                self.record_failure(BalanceError::network(err.to_string(), chain_ids))
                    .await;
                FetchOutcome::Failed
            }
            Race::TimedOut => {
                log::warn!(
                    "Balance fetch for chains {:?} exceeded {:?}",
                    to_fetch,
                    self.settings.fetch_timeout
                );
                self.record_failure(BalanceError::timeout(chain_ids)).await;
                FetchOutcome::Failed
            }
        }
    }

    async fn race_fetch(&self, owner: Address, chain_ids: &[u64], generation: u64) -> Race {
        let mut fetch = self.source.get_all_tokens_across_chains(owner, chain_ids);
        let slow = tokio::time::sleep(self.settings.slow_threshold);
        let deadline = tokio::time::sleep(self.settings.fetch_timeout);
        tokio::pin!(slow);
        tokio::pin!(deadline);
        let mut slow_flagged = false;

        loop {
            tokio::select! {
                result = &mut fetch => return Race::Completed(result),
                _ = &mut deadline => return Race::TimedOut,
                _ = &mut slow, if !slow_flagged => {
                    slow_flagged = true;
                    if self.generation.load(Ordering::SeqCst) == generation {
                        log::info!("Balance fetch for chains {:?} is slow", chain_ids);
                        self.state.write().await.is_slow_fetch = true;
                    }
                }
            }
        }
    }

    async fn apply_fetched(&self, requested: &[u64], balances: Vec<TokenBalance>) {
        let mut returned_chains = BTreeSet::new();
        for balance in &balances {
            self.cache.put(&balance.token, &balance.formatted_balance).await;
            returned_chains.insert(balance.token.chain_id);
        }
        for chain_id in &returned_chains {
            self.cache.mark_chain_fetched(*chain_id).await;
        }

        let mut state = self.state.write().await;
        for balance in balances {
            state
                .balance_by_token_key
                .insert(balance.token.key(), balance.formatted_balance);
        }
        for chain_id in requested {
            if returned_chains.contains(chain_id) {
                state.successful_chains.insert(*chain_id);
                state.failed_chains.remove(chain_id);
            } else {
                state.successful_chains.remove(chain_id);
            }
        }
        state.is_fetching = false;
        state.is_slow_fetch = false;
        state.balance_error = None;
        state.retry_state = self
            .settings
            .retry_policy
            .transition(state.retry_state, RetryEvent::FetchSucceeded);
        state.last_updated = Some(Utc::now());
        let missing = requested.iter().filter(|c| !returned_chains.contains(*c)).count();
        log::info!(
            "Balances updated for chains {:?} ({} missing)",
            returned_chains,
            missing
        );
    }

    async fn record_failure(&self, mut error: BalanceError) {
        let exhausted = {
            let mut state = self.state.write().await;
            state.retry_state = self
                .settings
                .retry_policy
                .transition(state.retry_state, RetryEvent::FetchFailed);
            if let RetryState::Exhausted { attempts } = state.retry_state {
                error = BalanceError::retries_exhausted(attempts, error.chain_ids);
            } else {
                error.can_retry = true;
            }
            for chain_id in &error.chain_ids {
                state.failed_chains.insert(*chain_id);
                state.successful_chains.remove(chain_id);
            }
            state.is_fetching = false;
            state.is_slow_fetch = false;
            state.balance_error = Some(error);
            !state.retry_state.can_retry()
        };

        if exhausted {
            self.notify_retries_exhausted();
        } else {
            self.notifier.notify(Notice::warning(
                "Balance check incomplete",
                "Some balances could not be loaded. You can still proceed with your donation.",
            ));
        }
    }

    fn notify_retries_exhausted(&self) {
        self.notifier.notify(Notice::error(
            "Maximum retry attempts reached",
            "Balances could not be refreshed. Reconnect your wallet or reload to try again.",
        ));
    }
}
