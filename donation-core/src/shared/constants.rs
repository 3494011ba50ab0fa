//! Constants for the donation core
//!
//! This module contains all constants used throughout the donation core.

// Balance cache constants
pub const BALANCE_CACHE_TTL_MS: u64 = 60_000;
pub const SLOW_FETCH_THRESHOLD_MS: u64 = 5_000;
pub const BALANCE_FETCH_TIMEOUT_MS: u64 = 15_000;

// Retry constants
pub const RETRY_DELAYS_MS: &[u64] = &[1_000, 2_000, 4_000];
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

// Address constants
pub const NATIVE_TOKEN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
pub const ADDRESS_LENGTH: usize = 42; // 0x + 40 hex chars

// Environment
pub const ENV_PREFIX: &str = "DONATION_CORE";
pub const LOG_LEVEL: &str = if cfg!(debug_assertions) { "debug" } else { "info" };

// Chain configurations
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub block_explorer: &'static str,
    pub native_currency: &'static str,
}

pub static ETHEREUM_CONFIG: NetworkConfig = NetworkConfig {
    chain_id: 1,
    name: "Ethereum",
    rpc_url: "https://eth.llamarpc.com",
    block_explorer: "https://etherscan.io",
    native_currency: "ETH",
};

pub static OPTIMISM_CONFIG: NetworkConfig = NetworkConfig {
    chain_id: 10,
    name: "Optimism",
    rpc_url: "https://mainnet.optimism.io",
    block_explorer: "https://optimistic.etherscan.io",
    native_currency: "ETH",
};

pub static POLYGON_CONFIG: NetworkConfig = NetworkConfig {
    chain_id: 137,
    name: "Polygon",
    rpc_url: "https://polygon-rpc.com",
    block_explorer: "https://polygonscan.com",
    native_currency: "POL",
};

pub static BASE_CONFIG: NetworkConfig = NetworkConfig {
    chain_id: 8453,
    name: "Base",
    rpc_url: "https://mainnet.base.org",
    block_explorer: "https://basescan.org",
    native_currency: "ETH",
};

pub static ARBITRUM_CONFIG: NetworkConfig = NetworkConfig {
    chain_id: 42161,
    name: "Arbitrum One",
    rpc_url: "https://arb1.arbitrum.io/rpc",
    block_explorer: "https://arbiscan.io",
    native_currency: "ETH",
};

pub static CELO_CONFIG: NetworkConfig = NetworkConfig {
    chain_id: 42220,
    name: "Celo",
    rpc_url: "https://forno.celo.org",
    block_explorer: "https://celoscan.io",
    native_currency: "CELO",
};

pub static SUPPORTED_NETWORKS: &[&NetworkConfig] = &[
    &ETHEREUM_CONFIG,
    &OPTIMISM_CONFIG,
    &POLYGON_CONFIG,
    &BASE_CONFIG,
    &ARBITRUM_CONFIG,
    &CELO_CONFIG,
];

/// Look up a built-in network by chain id
pub fn network_config(chain_id: u64) -> Option<&'static NetworkConfig> {
    SUPPORTED_NETWORKS
        .iter()
        .copied()
        .find(|network| network.chain_id == chain_id)
}

// Token configurations
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    pub address: &'static str,
    pub chain_id: u64,
    pub is_native: bool,
}

const fn native(symbol: &'static str, name: &'static str, chain_id: u64) -> TokenConfig {
    TokenConfig {
        symbol,
        name,
        decimals: 18,
        address: NATIVE_TOKEN_ADDRESS,
        chain_id,
        is_native: true,
    }
}

const fn usdc(address: &'static str, chain_id: u64) -> TokenConfig {
    TokenConfig {
        symbol: "USDC",
        name: "USD Coin",
        decimals: 6,
        address,
        chain_id,
        is_native: false,
    }
}

pub static SUPPORTED_TOKEN_CONFIGS: &[TokenConfig] = &[
    native("ETH", "Ether", 1),
    usdc("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 1),
    native("ETH", "Ether", 10),
    usdc("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85", 10),
    native("POL", "Polygon Ecosystem Token", 137),
    usdc("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", 137),
    native("ETH", "Ether", 8453),
    usdc("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", 8453),
    native("ETH", "Ether", 42161),
    usdc("0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 42161),
    native("CELO", "Celo", 42220),
    usdc("0xcebA9300f2b948710d2653dD7B07f33A8B32118C", 42220),
];

// Build information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
