//! Checkout use case
//!
//! Cart → balances for the cart's chains → validation → execution. Nothing
//! is submitted unless every payment fits the balances currently known.

use std::sync::Arc;
use crate::core::balances::{BalanceRequest, CrossChainBalances, FetchOutcome};
use crate::core::transfers::{ExecutionReport, TransferExecutor};
use uuid::Uuid;
use crate::core::validation::{validate_payments, ValidationResult};
use crate::domain::entities::DonationPayment;
use crate::shared::error::DonationError;
use crate::shared::types::Address;

pub struct DonationCheckout {
    balances: Arc<CrossChainBalances>,
    executor: Arc<TransferExecutor>,
}

impl DonationCheckout {
    pub fn new(balances: Arc<CrossChainBalances>, executor: Arc<TransferExecutor>) -> Self {
        Self { balances, executor }
    }

    /// Bring balances up to date for every chain in the cart
    pub async fn refresh_for_cart(
        &self,
        owner: Option<Address>,
        current_chain_id: Option<u64>,
        payments: &[DonationPayment],
    ) -> FetchOutcome {
        let chain_ids = payments.iter().map(|p| p.chain_id).collect();
        self.balances
            .refresh(BalanceRequest::new(owner, current_chain_id, chain_ids))
            .await
    }

    pub async fn validate(&self, payments: &[DonationPayment]) -> ValidationResult {
        let balances = self.balances.balance_by_token_key().await;
        validate_payments(payments, &balances)
    }

    /// Validate against the current balances, then execute
    pub async fn checkout(&self, payments: &[DonationPayment]) -> Result<ExecutionReport, DonationError> {
        self.ensure_valid(payments).await?;
        let report = self.executor.execute_donations(payments).await?;
        self.log_completed(&report);
        Ok(report)
    }

    /// Finish a checkout whose earlier run failed on some chains
    pub async fn resume(&self, execution_id: Uuid, payments: &[DonationPayment]) -> Result<ExecutionReport, DonationError> {
        self.ensure_valid(payments).await?;
        let report = self.executor.resume(execution_id, payments).await?;
        self.log_completed(&report);
        Ok(report)
    }

    async fn ensure_valid(&self, payments: &[DonationPayment]) -> Result<(), DonationError> {
        let validation = self.validate(payments).await;
        if !validation.valid {
            log::info!("Checkout blocked by validation: {:?}", validation.errors);
            return Err(DonationError::validation(validation.errors.join("; ")));
        }
        Ok(())
    }

    fn log_completed(&self, report: &ExecutionReport) {
        log::info!(
            "Checkout {} completed with {} transfer(s)",
            report.execution_id,
            report.records.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockPayoutAddressResolver;
    use crate::core::balances::{BalanceCache, BalanceFetchSettings};
    use crate::core::transfers::DonationContracts;
    use crate::test_support::{
        owner, payment, payout, FakeBalanceSource, FakeWallet, FixedAllowances, RecordingNotifier,
        ScriptedChainSync,
    };

    fn checkout_with(balances: &[(&str, u64, &str)]) -> (DonationCheckout, Arc<FakeWallet>) {
        let settings = BalanceFetchSettings::default();
        let balances = Arc::new(CrossChainBalances::new(
            Arc::new(FakeBalanceSource::with_balances(balances)),
            BalanceCache::new(settings.cache_ttl),
            Arc::new(RecordingNotifier::default()),
            settings,
        ));

        let mut payouts = MockPayoutAddressResolver::new();
        payouts
            .expect_resolve_payout_address()
            .returning(|_, _| Ok(Some(format!("{:?}", payout(7)))));
        let wallet = Arc::new(FakeWallet::connected(10));
        let executor = Arc::new(TransferExecutor::new(
            wallet.clone(),
            Arc::new(ScriptedChainSync::default()),
            Arc::new(payouts),
            Arc::new(FixedAllowances::default()),
            DonationContracts::new(),
        ));
        (DonationCheckout::new(balances, executor), wallet)
    }

    #[tokio::test]
    async fn test_checkout_within_balance() {
        let (checkout, wallet) = checkout_with(&[("USDC", 10, "1000")]);
        let cart = [payment("p1", "100", "USDC", 10)];

        assert_eq!(
            checkout.refresh_for_cart(Some(owner()), Some(10), &cart).await,
            FetchOutcome::Fetched
        );
        let report = checkout.checkout(&cart).await.unwrap();
        assert!(report.all_succeeded());
        assert_eq!(wallet.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_second_checkout_to_same_project() {
        let (checkout, wallet) = checkout_with(&[("USDC", 10, "1000")]);
        checkout
            .refresh_for_cart(Some(owner()), Some(10), &[payment("p1", "5", "USDC", 10)])
            .await;

        let first = checkout.checkout(&[payment("p1", "5", "USDC", 10)]).await.unwrap();
        let second = checkout.checkout(&[payment("p1", "10", "USDC", 10)]).await.unwrap();

        assert_ne!(first.execution_id, second.execution_id);
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].payment.amount, "10");
        assert!(second.all_succeeded());
        assert_eq!(wallet.writes().len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_blocked_by_validation() {
        let (checkout, wallet) = checkout_with(&[("USDC", 10, "100")]);
        let cart = [payment("p1", "10000", "USDC", 10)];

        checkout.refresh_for_cart(Some(owner()), Some(10), &cart).await;
        let err = checkout.checkout(&cart).await.unwrap_err();
        assert!(matches!(err, DonationError::Validation(ref m) if m.contains("Insufficient USDC")));
        assert!(wallet.events().is_empty());
    }
}
