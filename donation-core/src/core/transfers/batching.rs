//! Chain grouping and call construction

use std::collections::HashMap;
use crate::application::ports::{BatchDonation, ContractCall};
use crate::domain::entities::DonationPayment;
use crate::shared::error::DonationError;
use crate::shared::types::{Address, U256};
use crate::shared::utils::parse_address;

/// A payment whose payout address and amount have been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayment {
    /// Position of the payment's record in the executor
    pub index: usize,
    pub payment: DonationPayment,
    pub recipient: Address,
    pub amount: U256,
}

impl PreparedPayment {
    pub fn token_address(&self) -> Result<Address, DonationError> {
        parse_address(&self.payment.token.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGroup {
    pub chain_id: u64,
    pub payments: Vec<PreparedPayment>,
}

impl ChainGroup {
    pub fn is_batch(&self) -> bool {
        self.payments.len() > 1
    }

    pub fn indices(&self) -> Vec<usize> {
        self.payments.iter().map(|p| p.index).collect()
    }

    /// Native value that has to accompany a batched call
    pub fn native_value(&self) -> U256 {
        self.payments
            .iter()
            .filter(|p| p.payment.token.is_native)
            .fold(U256::zero(), |total, p| total.saturating_add(p.amount))
    }
}

/// Group payments by chain in order of first appearance, moving the chain
/// the wallet is already on to the front.
pub fn group_by_chain(payments: Vec<PreparedPayment>, current_chain_id: Option<u64>) -> Vec<ChainGroup> {
    let mut groups: Vec<ChainGroup> = Vec::new();
    let mut positions: HashMap<u64, usize> = HashMap::new();

    for payment in payments {
        let chain_id = payment.payment.chain_id;
        match positions.get(&chain_id) {
            Some(position) => groups[*position].payments.push(payment),
            None => {
                positions.insert(chain_id, groups.len());
                groups.push(ChainGroup {
                    chain_id,
                    payments: vec![payment],
                });
            }
        }
    }

    if let Some(current) = current_chain_id {
        if let Some(position) = groups.iter().position(|g| g.chain_id == current) {
            let group = groups.remove(position);
            groups.insert(0, group);
        }
    }
    groups
}

/// The single transaction that moves a group's funds.
///
/// One payment goes straight to its recipient. Several go through the
/// chain's batch donation contract.
pub fn build_transfer_call(group: &ChainGroup, donation_contract: Option<Address>) -> Result<ContractCall, DonationError> {
    match group.payments.as_slice() {
        [] => Err(DonationError::internal(format!("Empty payment group for chain {}", group.chain_id))),
        [single] if single.payment.token.is_native => Ok(ContractCall::NativeTransfer {
            chain_id: group.chain_id,
            to: single.recipient,
            amount: single.amount,
        }),
        [single] => Ok(ContractCall::TokenTransfer {
            chain_id: group.chain_id,
            token: single.token_address()?,
            to: single.recipient,
            amount: single.amount,
        }),
        payments => {
            let contract = donation_contract.ok_or_else(|| {
                DonationError::config(format!("No batch donation contract configured for chain {}", group.chain_id))
            })?;
            let donations = payments
                .iter()
                .map(|p| {
                    Ok(BatchDonation {
                        recipient: p.recipient,
                        token: p.token_address()?,
                        amount: p.amount,
                    })
                })
                .collect::<Result<Vec<_>, DonationError>>()?;
            Ok(ContractCall::BatchDonate {
                chain_id: group.chain_id,
                contract,
                donations,
                value: group.native_value(),
            })
        }
    }
}
