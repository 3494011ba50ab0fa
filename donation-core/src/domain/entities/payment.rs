//! Donation payment and transfer record entities
//!
//! A `DonationPayment` is one cart line. Once execution starts each payment
//! gets a `TransferRecord` that walks the per-payment state machine:
//!
//! `queued -> (approving) -> submitted -> confirming -> success | error`

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::entities::token::SupportedToken;
use crate::shared::error::DonationError;
use crate::shared::types::{TxHash, U256};
use crate::shared::utils::parse_amount;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DonationPayment {
    pub project_id: String,
    /// Decimal amount in whole token units, e.g. "12.5"
    pub amount: String,
    pub token: SupportedToken,
    pub chain_id: u64,
}

impl DonationPayment {
    pub fn new(project_id: impl Into<String>, amount: impl Into<String>, token: SupportedToken) -> Self {
        let chain_id = token.chain_id;
        Self {
            project_id: project_id.into(),
            amount: amount.into(),
            token,
            chain_id,
        }
    }

    pub fn token_key(&self) -> String {
        self.token.key()
    }

    /// Identity of the payment inside one executor: project plus token/chain
    pub fn record_key(&self) -> String {
        format!("{}:{}", self.project_id, self.token.key())
    }

    pub fn amount_in_base_units(&self) -> Result<U256, DonationError> {
        parse_amount(&self.amount, self.token.decimals)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Queued,
    Approving,
    Submitted,
    Confirming,
    Success,
    Error,
}

impl TransferStatus {
    /// Everything before a terminal state counts as pending
    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Success | TransferStatus::Error)
    }

    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        match (self, next) {
            (_, Error) => !self.is_terminal(),
            (Queued, Approving) | (Queued, Submitted) => true,
            (Approving, Submitted) => true,
            (Submitted, Confirming) => true,
            (Confirming, Success) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub payment: DonationPayment,
    pub status: TransferStatus,
    pub tx_hash: Option<TxHash>,
    pub explorer_url: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn queued(payment: DonationPayment) -> Self {
        Self {
            payment,
            status: TransferStatus::Queued,
            tx_hash: None,
            explorer_url: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn advance(&mut self, next: TransferStatus) -> Result<(), DonationError> {
        if !self.status.can_transition_to(next) {
            return Err(DonationError::internal(format!(
                "Invalid transfer transition {:?} -> {:?} for {}",
                self.status,
                next,
                self.payment.record_key()
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to `Error` from any non-terminal state
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TransferStatus::Error;
        self.error = Some(message.into());
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
}
