//! Donation validation
//!
//! Checks a cart against the balances the user currently holds. Pure: no
//! network access, the balance map is whatever the cross-chain view holds.

use std::collections::HashMap;
use serde::Serialize;
use crate::domain::entities::DonationPayment;
use crate::shared::types::U256;
use crate::shared::utils::{format_amount, parse_amount};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate payments against balances keyed by `SYMBOL-chainId`.
///
/// Payments sharing a token key draw from the same balance, so their amounts
/// are summed before comparing. A missing or unreadable balance counts as
/// zero.
pub fn validate_payments(payments: &[DonationPayment], balances: &HashMap<String, String>) -> ValidationResult {
    if payments.is_empty() {
        return ValidationResult::from_errors(vec!["No donations to process".to_string()]);
    }

    let mut errors = Vec::new();
    let mut committed: HashMap<String, U256> = HashMap::new();

    for payment in payments {
        let decimals = payment.token.decimals;
        let requested = match parse_amount(&payment.amount, decimals) {
            Ok(amount) if amount.is_zero() => {
                errors.push(format!(
                    "Donation amount for project {} must be greater than zero",
                    payment.project_id
                ));
                continue;
            }
            Ok(amount) => amount,
            Err(_) => {
                errors.push(format!(
                    "Invalid donation amount \"{}\" for project {}",
                    payment.amount, payment.project_id
                ));
                continue;
            }
        };

        let key = payment.token_key();
        let available = balances
            .get(&key)
            .and_then(|balance| parse_amount(balance, decimals).ok())
            .unwrap_or_default();

        let total = committed.entry(key).or_default();
        *total = total.saturating_add(requested);

        if *total > available {
            errors.push(format!(
                "Insufficient {} balance on {}. Required: {}, available: {}",
                payment.token.symbol,
                payment.token.chain_name,
                format_amount(*total, decimals),
                format_amount(available, decimals)
            ));
        }
    }

    if !errors.is_empty() {
        log::debug!("Donation validation failed with {} error(s)", errors.len());
    }
    ValidationResult::from_errors(errors)
}
