//! In-memory payout directory
//!
//! Projects may register one address per chain and a fallback used on
//! chains without a specific entry. Values are returned as stored; the
//! executor rejects empty or malformed ones.

use std::collections::HashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::application::ports::PayoutAddressResolver;
use crate::shared::error::DonationError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPayoutDirectory {
    per_chain: HashMap<String, HashMap<u64, String>>,
    fallback: HashMap<String, String>,
}

impl StaticPayoutDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, project_id: &str, chain_id: u64, address: &str) -> Self {
        self.set_address(project_id, chain_id, address);
        self
    }

    pub fn with_fallback(mut self, project_id: &str, address: &str) -> Self {
        self.fallback.insert(project_id.to_string(), address.to_string());
        self
    }

    pub fn set_address(&mut self, project_id: &str, chain_id: u64, address: &str) {
        self.per_chain
            .entry(project_id.to_string())
            .or_default()
            .insert(chain_id, address.to_string());
    }

    pub fn len(&self) -> usize {
        let mut projects: Vec<&String> = self.per_chain.keys().chain(self.fallback.keys()).collect();
        projects.sort();
        projects.dedup();
        projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PayoutAddressResolver for StaticPayoutDirectory {
    async fn resolve_payout_address(&self, project_id: &str, chain_id: u64) -> Result<Option<String>, DonationError> {
        let address = self
            .per_chain
            .get(project_id)
            .and_then(|chains| chains.get(&chain_id))
            .or_else(|| self.fallback.get(project_id))
            .cloned();
        Ok(address)
    }
}
