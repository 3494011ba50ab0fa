//! End-to-end checkout scenarios against in-memory chain and wallet fakes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use donation_core::{
    find_token, AllowanceReader, BalanceCache, BalanceFetchSettings, BalanceRequest, BalanceSource,
    ChainSyncValidator, ContractCall, CrossChainBalances, DonationCheckout, DonationContracts, DonationError,
    DonationPayment, FetchOutcome, Notice, Notifier, RetryPolicy, StaticPayoutDirectory, TokenBalance,
    TransferExecutor, TransferReceipt, TransferStatus, WalletClient,
};
use donation_core::domain::entities::ReceiptStatus;
use donation_core::{Address, TxHash, U256};

// ════════════════════════════════════════════════════════════════════════════════
// FAKES
// ════════════════════════════════════════════════════════════════════════════════

struct InMemoryBalances {
    balances: Vec<(&'static str, u64, U256)>,
    delay: Duration,
}

#[async_trait]
impl BalanceSource for InMemoryBalances {
    async fn get_all_tokens_across_chains(
        &self,
        _owner: Address,
        chain_ids: &[u64],
    ) -> Result<Vec<TokenBalance>, DonationError> {
        tokio::time::sleep(self.delay).await;
        Ok(self
            .balances
            .iter()
            .filter(|(_, chain_id, _)| chain_ids.contains(chain_id))
            .map(|(symbol, chain_id, raw)| TokenBalance::new(find_token(symbol, *chain_id).unwrap().clone(), *raw))
            .collect())
    }
}

#[derive(Default)]
struct CollectingNotifier(Mutex<Vec<Notice>>);

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

struct UnlimitedAllowance;

#[async_trait]
impl AllowanceReader for UnlimitedAllowance {
    async fn allowance(&self, _: u64, _: Address, _: Address, _: Address) -> Result<U256, DonationError> {
        Ok(U256::MAX)
    }
}

struct InSync;

#[async_trait]
impl ChainSyncValidator for InSync {
    async fn validate_chain_sync(&self, _expected_chain_id: u64) -> Result<bool, DonationError> {
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Switch(u64),
    Send(ContractCall),
    Receipt(u64),
}

struct ScriptedWallet {
    chain: Mutex<u64>,
    steps: Mutex<Vec<Step>>,
    nonce: AtomicU64,
    revert: bool,
}

impl ScriptedWallet {
    fn on_chain(chain_id: u64) -> Self {
        Self {
            chain: Mutex::new(chain_id),
            steps: Mutex::new(Vec::new()),
            nonce: AtomicU64::new(1),
            revert: false,
        }
    }

    fn reverting(chain_id: u64) -> Self {
        Self {
            revert: true,
            ..Self::on_chain(chain_id)
        }
    }

    fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletClient for ScriptedWallet {
    async fn account(&self) -> Result<Option<Address>, DonationError> {
        Ok(Some(Address::from_low_u64_be(0xd0)))
    }

    async fn chain_id(&self) -> Result<u64, DonationError> {
        Ok(*self.chain.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), DonationError> {
        self.steps.lock().unwrap().push(Step::Switch(chain_id));
        *self.chain.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn write_contract(&self, call: ContractCall) -> Result<TxHash, DonationError> {
        self.steps.lock().unwrap().push(Step::Send(call));
        Ok(TxHash::from_low_u64_be(self.nonce.fetch_add(1, Ordering::SeqCst)))
    }

    async fn wait_for_transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> Result<TransferReceipt, DonationError> {
        self.steps.lock().unwrap().push(Step::Receipt(chain_id));
        Ok(TransferReceipt {
            transaction_hash: tx_hash,
            status: if self.revert { ReceiptStatus::Reverted } else { ReceiptStatus::Success },
            block_number: Some(1),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// HELPERS
// ════════════════════════════════════════════════════════════════════════════════

const PAYOUT_A: &str = "0x00000000000000000000000000000000000000a1";
const PAYOUT_B: &str = "0x00000000000000000000000000000000000000b2";
const PAYOUT_C: &str = "0x00000000000000000000000000000000000000c3";

fn owner() -> Address {
    Address::from_low_u64_be(0xd0)
}

fn usdc(units: u64) -> U256 {
    U256::from(units) * U256::exp10(6)
}

fn donation(project_id: &str, amount: &str, symbol: &str, chain_id: u64) -> DonationPayment {
    DonationPayment::new(project_id, amount, find_token(symbol, chain_id).unwrap().clone())
}

fn fast_settings() -> BalanceFetchSettings {
    BalanceFetchSettings {
        cache_ttl: Duration::from_secs(60),
        slow_threshold: Duration::from_millis(20),
        fetch_timeout: Duration::from_millis(60),
        retry_policy: RetryPolicy::new(vec![Duration::from_millis(1)], 3),
    }
}

struct Flow {
    balances: Arc<CrossChainBalances>,
    checkout: DonationCheckout,
    executor: Arc<TransferExecutor>,
    wallet: Arc<ScriptedWallet>,
    notices: Arc<CollectingNotifier>,
}

fn flow(
    balances: Vec<(&'static str, u64, U256)>,
    payouts: StaticPayoutDirectory,
    wallet: ScriptedWallet,
    fetch_delay: Duration,
) -> Flow {
    let settings = fast_settings();
    let notices = Arc::new(CollectingNotifier::default());
    let cross_chain = Arc::new(CrossChainBalances::new(
        Arc::new(InMemoryBalances {
            balances,
            delay: fetch_delay,
        }),
        BalanceCache::new(settings.cache_ttl),
        notices.clone(),
        settings,
    ));
    let wallet = Arc::new(wallet);
    let contracts = DonationContracts::new()
        .with(10, Address::from_low_u64_be(0xc0de))
        .with(42161, Address::from_low_u64_be(0xc0de));
    let executor = Arc::new(TransferExecutor::new(
        wallet.clone(),
        Arc::new(InSync),
        Arc::new(payouts),
        Arc::new(UnlimitedAllowance),
        contracts,
    ));
    Flow {
        checkout: DonationCheckout::new(cross_chain.clone(), executor.clone()),
        balances: cross_chain,
        executor,
        wallet,
        notices,
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn donation_within_balance_succeeds() {
    let f = flow(
        vec![("USDC", 10, usdc(1000))],
        StaticPayoutDirectory::new().with_address("climate", 10, PAYOUT_A),
        ScriptedWallet::on_chain(10),
        Duration::ZERO,
    );
    let cart = vec![donation("climate", "100", "USDC", 10)];

    assert_eq!(
        f.checkout.refresh_for_cart(Some(owner()), Some(10), &cart).await,
        FetchOutcome::Fetched
    );
    assert_eq!(f.balances.get_balance("USDC", 10).await.as_deref(), Some("1000"));

    let report = f.checkout.checkout(&cart).await.unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].status, TransferStatus::Success);
    assert!(report.records[0].tx_hash.is_some());
}

#[tokio::test]
async fn donation_above_balance_is_invalid() {
    let f = flow(
        vec![("USDC", 10, usdc(100))],
        StaticPayoutDirectory::new().with_address("climate", 10, PAYOUT_A),
        ScriptedWallet::on_chain(10),
        Duration::ZERO,
    );
    let cart = vec![donation("climate", "10000", "USDC", 10)];
    f.checkout.refresh_for_cart(Some(owner()), Some(10), &cart).await;

    let validation = f.checkout.validate(&cart).await;
    assert!(!validation.valid);
    assert!(validation.errors.iter().any(|e| e.contains("Insufficient")));

    assert!(matches!(f.checkout.checkout(&cart).await, Err(DonationError::Validation(_))));
    assert!(f.wallet.steps().is_empty());
}

#[tokio::test]
async fn empty_payout_address_rejects_before_wallet() {
    let f = flow(
        vec![("USDC", 10, usdc(1000))],
        StaticPayoutDirectory::new().with_address("climate", 10, ""),
        ScriptedWallet::on_chain(10),
        Duration::ZERO,
    );
    let cart = vec![donation("climate", "1", "USDC", 10)];

    let err = f.executor.execute_donations(&cart).await.unwrap_err();
    assert!(err.to_string().contains("Missing payout address"));
    assert!(f.wallet.steps().is_empty());
}

#[tokio::test]
async fn same_chain_payments_are_batched_before_next_chain() {
    let f = flow(
        vec![],
        StaticPayoutDirectory::new()
            .with_fallback("a", PAYOUT_A)
            .with_fallback("b", PAYOUT_B)
            .with_fallback("c", PAYOUT_C),
        ScriptedWallet::on_chain(1),
        Duration::ZERO,
    );
    let cart = vec![
        donation("a", "5", "USDC", 10),
        donation("c", "7", "USDC", 42161),
        donation("b", "3", "USDC", 10),
    ];

    let report = f.executor.execute_donations(&cart).await.unwrap();
    assert!(report.all_succeeded());

    let steps = f.wallet.steps();
    let sends: Vec<&ContractCall> = steps
        .iter()
        .filter_map(|s| match s {
            Step::Send(call) => Some(call),
            _ => None,
        })
        .collect();
    assert_eq!(sends.len(), 2);
    match sends[0] {
        ContractCall::BatchDonate { chain_id, donations, .. } => {
            assert_eq!(*chain_id, 10);
            assert_eq!(donations.len(), 2);
            assert_eq!(donations[0].amount, usdc(5));
            assert_eq!(donations[1].amount, usdc(3));
        }
        other => panic!("expected a batch on chain 10, got {:?}", other),
    }
    assert!(matches!(sends[1], ContractCall::TokenTransfer { chain_id: 42161, .. }));

    let chain_10_done = steps.iter().position(|s| *s == Step::Receipt(10)).unwrap();
    let switch_to_arbitrum = steps.iter().position(|s| *s == Step::Switch(42161)).unwrap();
    assert!(chain_10_done < switch_to_arbitrum);
}

#[tokio::test]
async fn reverted_receipt_rejects_without_success() {
    let f = flow(
        vec![("USDC", 10, usdc(1000))],
        StaticPayoutDirectory::new().with_address("climate", 10, PAYOUT_A),
        ScriptedWallet::reverting(10),
        Duration::ZERO,
    );
    let cart = vec![donation("climate", "1", "USDC", 10)];

    let err = f.executor.execute_donations(&cart).await.unwrap_err();
    assert!(matches!(err, DonationError::Reverted { chain_id: 10, .. }));
    let records = f.executor.transfer_records().await;
    assert!(records.iter().all(|r| r.status != TransferStatus::Success));
    assert!(records[0].error.is_some());
}

#[tokio::test]
async fn hung_balance_fetch_times_out_for_every_chain() {
    let f = flow(
        vec![("USDC", 10, usdc(1))],
        StaticPayoutDirectory::new(),
        ScriptedWallet::on_chain(10),
        Duration::from_secs(30),
    );

    let outcome = f
        .balances
        .refresh(BalanceRequest::new(Some(owner()), Some(10), vec![42161, 10, 8453]))
        .await;
    assert_eq!(outcome, FetchOutcome::Failed);

    let error = f.balances.balance_error().await.unwrap();
    let mut chains = error.chain_ids.clone();
    chains.sort_unstable();
    assert_eq!(chains, vec![10, 8453, 42161]);
    assert_eq!(f.notices.0.lock().unwrap().len(), 1);
}
