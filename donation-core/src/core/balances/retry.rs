//! Retry state machine for balance fetches
//!
//! `Idle -> Retrying(1) -> ... -> Retrying(max) -> Exhausted`
//!
//! A successful fetch always returns to `Idle`. Transitions are a pure
//! function of the current state and the event.

use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RetryState {
    #[default]
    Idle,
    Retrying { attempt: u32 },
    Exhausted { attempts: u32 },
}

impl RetryState {
    pub fn can_retry(&self) -> bool {
        !matches!(self, RetryState::Exhausted { .. })
    }

    /// Number of retries spent so far
    pub fn attempts(&self) -> u32 {
        match self {
            RetryState::Idle => 0,
            RetryState::Retrying { attempt } => *attempt,
            RetryState::Exhausted { attempts } => *attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    RetryRequested,
    FetchSucceeded,
    FetchFailed,
}

/// Capped backoff: a fixed delay table plus a maximum attempt count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, max_attempts: u32) -> Self {
        Self { delays, max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given 1-based attempt; the last table entry repeats
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.delays.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempt.saturating_sub(1) as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    pub fn transition(&self, state: RetryState, event: RetryEvent) -> RetryState {
        match (state, event) {
            (_, RetryEvent::FetchSucceeded) => RetryState::Idle,

            (RetryState::Idle, RetryEvent::RetryRequested) => {
                if self.max_attempts == 0 {
                    RetryState::Exhausted { attempts: 0 }
                } else {
                    RetryState::Retrying { attempt: 1 }
                }
            }
            (RetryState::Retrying { attempt }, RetryEvent::RetryRequested) => {
                if attempt < self.max_attempts {
                    RetryState::Retrying { attempt: attempt + 1 }
                } else {
                    RetryState::Exhausted { attempts: attempt }
                }
            }
            (RetryState::Retrying { attempt }, RetryEvent::FetchFailed) if attempt >= self.max_attempts => {
                RetryState::Exhausted { attempts: attempt }
            }

            (state, _) => state,
        }
    }
}
