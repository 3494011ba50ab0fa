//! ERC-20 approval checks
//!
//! Reads the allowance the owner has granted a spender for every distinct
//! token in a set of payments and, when asked, sends the approvals that are
//! short. Native assets never need approval.

use std::sync::Arc;
use serde::Serialize;
use crate::application::ports::{AllowanceReader, ContractCall, WalletClient};
use crate::domain::entities::{DonationPayment, ReceiptStatus, SupportedToken};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, TxHash, U256};
use crate::shared::utils::parse_address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequirement {
    pub token: SupportedToken,
    pub token_address: Address,
    pub chain_id: u64,
    pub spender: Address,
    pub required_amount: U256,
    pub current_allowance: U256,
    pub needs_approval: bool,
    pub shortfall: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    pub token_key: String,
    pub chain_id: u64,
    pub tx_hash: TxHash,
}

pub struct ApprovalChecker {
    allowances: Arc<dyn AllowanceReader>,
    wallet: Arc<dyn WalletClient>,
}

impl ApprovalChecker {
    pub fn new(allowances: Arc<dyn AllowanceReader>, wallet: Arc<dyn WalletClient>) -> Self {
        Self { allowances, wallet }
    }

    /// One requirement per distinct ERC-20 (token, chain), in cart order.
    ///
    /// Amounts of payments sharing a token are summed. Read-only.
    pub async fn check_allowances(
        &self,
        owner: Address,
        spender: Address,
        payments: &[DonationPayment],
    ) -> Result<Vec<ApprovalRequirement>, DonationError> {
        let mut totals: Vec<(SupportedToken, U256)> = Vec::new();
        for payment in payments.iter().filter(|p| !p.token.is_native) {
            let amount = payment.amount_in_base_units()?;
            match totals.iter_mut().find(|(token, _)| token.key() == payment.token.key()) {
                Some((_, total)) => *total = total.saturating_add(amount),
                None => totals.push((payment.token.clone(), amount)),
            }
        }

        let mut requirements = Vec::with_capacity(totals.len());
        for (token, required_amount) in totals {
            let token_address = parse_address(&token.address)?;
            let current_allowance = self
                .allowances
                .allowance(token.chain_id, token_address, owner, spender)
                .await?;
            let needs_approval = current_allowance < required_amount;
            let shortfall = required_amount.saturating_sub(current_allowance);
            log::debug!(
                "Allowance for {} to {:?}: {} (required {})",
                token.key(),
                spender,
                current_allowance,
                required_amount
            );
            requirements.push(ApprovalRequirement {
                chain_id: token.chain_id,
                token,
                token_address,
                spender,
                required_amount,
                current_allowance,
                needs_approval,
                shortfall,
            });
        }

        Ok(requirements)
    }

    /// Approve the exact required amount for each requirement that is short.
    ///
    /// The wallet must already be on the requirement's chain. Stops at the
    /// first rejection or reverted approval.
    pub async fn execute_approvals(
        &self,
        requirements: &[ApprovalRequirement],
    ) -> Result<Vec<ApprovalOutcome>, DonationError> {
        let mut outcomes = Vec::new();
        for requirement in requirements.iter().filter(|r| r.needs_approval) {
            let token_key = requirement.token.key();
            log::info!("Requesting approval of {} for {:?}", token_key, requirement.spender);

            let tx_hash = self
                .wallet
                .write_contract(ContractCall::Approve {
                    chain_id: requirement.chain_id,
                    token: requirement.token_address,
                    spender: requirement.spender,
                    amount: requirement.required_amount,
                })
                .await?;

            let receipt = self
                .wallet
                .wait_for_transaction_receipt(requirement.chain_id, tx_hash)
                .await?;
            if receipt.status == ReceiptStatus::Reverted {
                log::warn!("Approval {:?} for {} reverted", tx_hash, token_key);
                return Err(DonationError::reverted(requirement.chain_id, format!("{:?}", tx_hash)));
            }

            outcomes.push(ApprovalOutcome {
                token_key,
                chain_id: requirement.chain_id,
                tx_hash,
            });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockAllowanceReader;
    use crate::test_support::{owner, payment, FakeWallet, WalletEvent};

    fn spender() -> Address {
        Address::from_low_u64_be(0xbeef)
    }

    fn usdc(units: u64) -> U256 {
        U256::from(units) * U256::exp10(6)
    }

    #[tokio::test]
    async fn test_native_payments_never_need_approval() {
        let mut reader = MockAllowanceReader::new();
        reader.expect_allowance().never();
        let checker = ApprovalChecker::new(Arc::new(reader), Arc::new(FakeWallet::connected(10)));

        let requirements = checker
            .check_allowances(owner(), spender(), &[payment("p1", "1", "ETH", 10)])
            .await
            .unwrap();
        assert!(requirements.is_empty());
    }

    #[tokio::test]
    async fn test_shortfall_is_reported_per_token() {
        let mut reader = MockAllowanceReader::new();
        reader
            .expect_allowance()
            .times(1)
            .returning(|_, _, _, _| Ok(U256::from(30u64) * U256::exp10(6)));
        let checker = ApprovalChecker::new(Arc::new(reader), Arc::new(FakeWallet::connected(10)));

        let payments = [payment("p1", "50", "USDC", 10), payment("p2", "25", "USDC", 10)];
        let requirements = checker.check_allowances(owner(), spender(), &payments).await.unwrap();

        assert_eq!(requirements.len(), 1);
        let requirement = &requirements[0];
        assert_eq!(requirement.chain_id, 10);
        assert_eq!(requirement.required_amount, usdc(75));
        assert_eq!(requirement.current_allowance, usdc(30));
        assert!(requirement.needs_approval);
        assert_eq!(requirement.shortfall, usdc(45));
    }

    #[tokio::test]
    async fn test_sufficient_allowance() {
        let mut reader = MockAllowanceReader::new();
        reader
            .expect_allowance()
            .withf(|chain_id, _, _, _| *chain_id == 42161)
            .returning(|_, _, _, _| Ok(U256::MAX));
        let checker = ApprovalChecker::new(Arc::new(reader), Arc::new(FakeWallet::connected(42161)));

        let requirements = checker
            .check_allowances(owner(), spender(), &[payment("p1", "10", "USDC", 42161)])
            .await
            .unwrap();
        assert!(!requirements[0].needs_approval);
        assert!(requirements[0].shortfall.is_zero());
    }

    #[tokio::test]
    async fn test_read_errors_propagate() {
        let mut reader = MockAllowanceReader::new();
        reader
            .expect_allowance()
            .returning(|_, _, _, _| Err(DonationError::network("rpc down")));
        let checker = ApprovalChecker::new(Arc::new(reader), Arc::new(FakeWallet::connected(10)));

        let result = checker
            .check_allowances(owner(), spender(), &[payment("p1", "10", "USDC", 10)])
            .await;
        assert!(matches!(result, Err(DonationError::Network(_))));
    }

    #[tokio::test]
    async fn test_execute_only_short_approvals() {
        let mut reader = MockAllowanceReader::new();
        reader
            .expect_allowance()
            .returning(|_, _, _, _| Ok(U256::zero()));
        let wallet = Arc::new(FakeWallet::connected(10));
        let checker = ApprovalChecker::new(Arc::new(reader), wallet.clone());

        let mut requirements = checker
            .check_allowances(owner(), spender(), &[payment("p1", "10", "USDC", 10)])
            .await
            .unwrap();
        let mut satisfied = requirements[0].clone();
        satisfied.needs_approval = false;
        requirements.push(satisfied);

        let outcomes = checker.execute_approvals(&requirements).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].token_key, "USDC-10");

        let events = wallet.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            WalletEvent::Write(ContractCall::Approve { amount, spender: s, .. }) if *amount == usdc(10) && *s == spender()
        ));
        assert!(matches!(events[1], WalletEvent::WaitReceipt(10, _)));
    }

    #[tokio::test]
    async fn test_rejected_approval() {
        let mut reader = MockAllowanceReader::new();
        reader
            .expect_allowance()
            .returning(|_, _, _, _| Ok(U256::zero()));
        let wallet = Arc::new(FakeWallet::connected(10));
        wallet.reject_approvals_on(10);
        let checker = ApprovalChecker::new(Arc::new(reader), wallet);

        let requirements = checker
            .check_allowances(owner(), spender(), &[payment("p1", "10", "USDC", 10)])
            .await
            .unwrap();
        let result = checker.execute_approvals(&requirements).await;
        assert!(matches!(result, Err(DonationError::UserRejected(_))));
    }
}
