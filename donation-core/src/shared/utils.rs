//! Utility functions for the donation core
//!
//! This module contains common utility functions used throughout the donation core.

use crate::shared::constants::{network_config, ADDRESS_LENGTH};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, TxHash, U256};

/// Key under which a token balance is cached: `SYMBOL-chainId`
pub fn token_key(symbol: &str, chain_id: u64) -> String {
    format!("{}-{}", symbol, chain_id)
}

/// Validate Ethereum address format
pub fn validate_ethereum_address(address: &str) -> Result<(), DonationError> {
    if !address.starts_with("0x") {
        return Err(DonationError::validation("Address must start with 0x"));
    }

    if address.len() != ADDRESS_LENGTH {
        return Err(DonationError::validation("Address must be 42 characters long"));
    }

    // Check if all characters after 0x are valid hex
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DonationError::validation("Address contains invalid hex characters"));
    }

    Ok(())
}

/// Parse an address string into an `Address`
pub fn parse_address(address: &str) -> Result<Address, DonationError> {
    let address = address.trim();
    validate_ethereum_address(address)?;
    address
        .parse::<Address>()
        .map_err(|e| DonationError::validation(format!("Invalid address {}: {}", address, e)))
}

/// Normalise an address to its EIP-55 checksummed form.
///
/// Empty input and the zero address are rejected.
pub fn checksum_address(address: &str) -> Result<String, DonationError> {
    if address.trim().is_empty() {
        return Err(DonationError::validation("Address cannot be empty"));
    }
    let parsed = parse_address(address)?;
    if parsed.is_zero() {
        return Err(DonationError::validation("Address cannot be the zero address"));
    }
    Ok(ethers::utils::to_checksum(&parsed, None))
}

/// Parse a decimal amount into base units
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, DonationError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(DonationError::validation("Amount cannot be empty"));
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(DonationError::validation("Invalid amount format"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(DonationError::validation(format!("Invalid amount format: {}", amount)));
    }
    if fraction.len() > decimals as usize {
        return Err(DonationError::validation(format!(
            "Amount {} has more than {} decimal places",
            amount, decimals
        )));
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(fraction);
    for _ in fraction.len()..decimals as usize {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| DonationError::validation(format!("Amount {} is too large", amount)))
}

/// Format base units as a decimal string without trailing zeros
pub fn format_amount(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    if decimals == 0 {
        return raw;
    }

    let decimals = decimals as usize;
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - raw.len() + 1), raw)
    } else {
        raw
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Block explorer link for a transaction, when the chain is known
pub fn tx_explorer_url(chain_id: u64, tx_hash: &TxHash) -> Option<String> {
    network_config(chain_id).map(|network| format!("{}/tx/{:?}", network.block_explorer, tx_hash))
}
