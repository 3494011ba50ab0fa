//! Token entity for the donation core

use serde::{Serialize, Deserialize};
use lazy_static::lazy_static;
use crate::shared::constants::{TokenConfig, SUPPORTED_TOKEN_CONFIGS};
use crate::shared::utils::token_key;
use super::network::chain_name;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SupportedToken {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub chain_id: u64,
    pub chain_name: String,
    pub is_native: bool,
}

impl SupportedToken {
    /// Cache key for this token: `SYMBOL-chainId`
    pub fn key(&self) -> String {
        token_key(&self.symbol, self.chain_id)
    }
}

impl From<&TokenConfig> for SupportedToken {
    fn from(config: &TokenConfig) -> Self {
        Self {
            address: config.address.to_string(),
            symbol: config.symbol.to_string(),
            name: config.name.to_string(),
            decimals: config.decimals,
            chain_id: config.chain_id,
            chain_name: chain_name(config.chain_id),
            is_native: config.is_native,
        }
    }
}

lazy_static! {
    static ref SUPPORTED_TOKENS: Vec<SupportedToken> =
        SUPPORTED_TOKEN_CONFIGS.iter().map(SupportedToken::from).collect();
}

/// All tokens the donation flow can pay with
pub fn supported_tokens() -> &'static [SupportedToken] {
    &SUPPORTED_TOKENS
}

pub fn tokens_for_chain(chain_id: u64) -> Vec<&'static SupportedToken> {
    SUPPORTED_TOKENS.iter().filter(|t| t.chain_id == chain_id).collect()
}

pub fn find_token(symbol: &str, chain_id: u64) -> Option<&'static SupportedToken> {
    SUPPORTED_TOKENS
        .iter()
        .find(|t| t.chain_id == chain_id && t.symbol.eq_ignore_ascii_case(symbol))
}
