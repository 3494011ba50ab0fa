//! Donation transfer execution
//!
//! Turns a validated cart into on-chain transactions. Payout addresses and
//! amounts are checked for the whole cart before the wallet is touched. Chain
//! groups then run one after another: switch network, confirm chain sync,
//! approve if the group is batched, submit, wait for the receipt.
//!
//! Groups are independent ledgers. A failed group does not stop later ones
//! and nothing already confirmed is rolled back. `resume` re-runs a cart
//! under the same execution id and skips only the lines that execution
//! already confirmed.
//!
//! One execution runs at a time per executor; overlapping calls wait.

pub mod batching;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use crate::application::ports::{
    AllowanceReader, ChainSyncValidator, PayoutAddressResolver, WalletClient,
};
use crate::core::approvals::{ApprovalChecker, ApprovalOutcome};
use crate::domain::entities::{DonationPayment, ReceiptStatus, TransferRecord, TransferStatus};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, TxHash};
use crate::shared::utils::{checksum_address, parse_address, tx_explorer_url};

pub use batching::{build_transfer_call, group_by_chain, ChainGroup, PreparedPayment};

/// Batch donation contract per chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationContracts {
    contracts: HashMap<u64, Address>,
}

impl DonationContracts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, chain_id: u64, contract: Address) -> Self {
        self.contracts.insert(chain_id, contract);
        self
    }

    pub fn insert(&mut self, chain_id: u64, contract: Address) {
        self.contracts.insert(chain_id, contract);
    }

    pub fn get(&self, chain_id: u64) -> Option<Address> {
        self.contracts.get(&chain_id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOutcome {
    pub chain_id: u64,
    pub payment_count: usize,
    pub approvals: Vec<ApprovalOutcome>,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub execution_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub chains: Vec<ChainOutcome>,
    pub records: Vec<TransferRecord>,
    /// Lines left out of a resumed run because this execution already
    /// confirmed them
    pub skipped: Vec<String>,
}

impl ExecutionReport {
    pub fn all_succeeded(&self) -> bool {
        self.records.iter().all(|r| r.status == TransferStatus::Success)
    }
}

pub struct TransferExecutor {
    wallet: Arc<dyn WalletClient>,
    chain_sync: Arc<dyn ChainSyncValidator>,
    payouts: Arc<dyn PayoutAddressResolver>,
    approvals: ApprovalChecker,
    contracts: DonationContracts,
    records: RwLock<Vec<TransferRecord>>,
    confirmed: RwLock<HashMap<Uuid, HashSet<String>>>,
    last_execution: RwLock<Option<Uuid>>,
    running: Mutex<()>,
}

impl TransferExecutor {
    pub fn new(
        wallet: Arc<dyn WalletClient>,
        chain_sync: Arc<dyn ChainSyncValidator>,
        payouts: Arc<dyn PayoutAddressResolver>,
        allowances: Arc<dyn AllowanceReader>,
        contracts: DonationContracts,
    ) -> Self {
        Self {
            approvals: ApprovalChecker::new(allowances, wallet.clone()),
            wallet,
            chain_sync,
            payouts,
            contracts,
            records: RwLock::new(Vec::new()),
            confirmed: RwLock::new(HashMap::new()),
            last_execution: RwLock::new(None),
            running: Mutex::new(()),
        }
    }

    /// Records of the most recent execution
    pub async fn transfer_records(&self) -> Vec<TransferRecord> {
        self.records.read().await.clone()
    }

    /// Id of the most recent execution, including one that failed
    pub async fn last_execution_id(&self) -> Option<Uuid> {
        *self.last_execution.read().await
    }

    /// Forget past executions and drop the records
    pub async fn reset(&self) {
        let _running = self.running.lock().await;
        self.records.write().await.clear();
        self.confirmed.write().await.clear();
        *self.last_execution.write().await = None;
    }

    /// Execute every payment, one chain group at a time.
    ///
    /// Returns the report when every group confirmed; otherwise the first
    /// group error, after all groups were attempted.
    pub async fn execute_donations(&self, payments: &[DonationPayment]) -> Result<ExecutionReport, DonationError> {
        let _running = self.running.lock().await;
        self.run(Uuid::new_v4(), payments, HashSet::new()).await
    }

    /// Re-run `payments` as part of `execution_id`, skipping the lines that
    /// execution already confirmed.
    pub async fn resume(
        &self,
        execution_id: Uuid,
        payments: &[DonationPayment],
    ) -> Result<ExecutionReport, DonationError> {
        let _running = self.running.lock().await;
        let confirmed = self
            .confirmed
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .ok_or_else(|| DonationError::validation(format!("Unknown execution {}", execution_id)))?;
        self.run(execution_id, payments, confirmed).await
    }

    async fn run(
        &self,
        execution_id: Uuid,
        payments: &[DonationPayment],
        confirmed: HashSet<String>,
    ) -> Result<ExecutionReport, DonationError> {
        let started_at = Utc::now();
        *self.last_execution.write().await = Some(execution_id);
        self.confirmed.write().await.entry(execution_id).or_default();

        let (pending, skipped): (Vec<DonationPayment>, Vec<DonationPayment>) = payments
            .iter()
            .cloned()
            .partition(|p| !confirmed.contains(&p.record_key()));
        let skipped: Vec<String> = skipped.iter().map(DonationPayment::record_key).collect();
        if !skipped.is_empty() {
            log::info!(
                "Execution {} resumed, skipping {} confirmed payment(s): {:?}",
                execution_id,
                skipped.len(),
                skipped
            );
        }

        let prepared = self.prepare(&pending).await?;

        let owner = self
            .wallet
            .account()
            .await?
            .ok_or(DonationError::WalletNotConnected)?;

        *self.records.write().await = pending.into_iter().map(TransferRecord::queued).collect();

        let current_chain_id = self.wallet.chain_id().await?;
        let groups = group_by_chain(prepared, Some(current_chain_id));
        log::info!(
            "Execution {} started: {} chain group(s), wallet on chain {}",
            execution_id,
            groups.len(),
            current_chain_id
        );

        let mut chains = Vec::with_capacity(groups.len());
        let mut first_error = None;
        for group in &groups {
            let mut outcome = ChainOutcome {
                chain_id: group.chain_id,
                payment_count: group.payments.len(),
                approvals: Vec::new(),
                tx_hash: None,
                error: None,
            };
            match self.process_group(execution_id, owner, group, &mut outcome).await {
                Ok(()) => log::info!("Chain {} group confirmed", group.chain_id),
                Err(err) => {
                    log::warn!("Chain {} group failed: {}", group.chain_id, err);
                    let message = err.to_string();
                    self.update_records(&group.indices(), |record| {
                        record.fail(message.clone());
                        Ok(())
                    })
                    .await?;
                    outcome.error = Some(message);
                    first_error.get_or_insert(err);
                }
            }
            chains.push(outcome);
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        Ok(ExecutionReport {
            execution_id,
            started_at,
            finished_at: Utc::now(),
            chains,
            records: self.transfer_records().await,
            skipped,
        })
    }

    /// Resolve payout addresses and amounts for the whole cart
    async fn prepare(&self, payments: &[DonationPayment]) -> Result<Vec<PreparedPayment>, DonationError> {
        let mut missing = Vec::new();
        let mut resolved = Vec::with_capacity(payments.len());

        for payment in payments {
            let address = self
                .payouts
                .resolve_payout_address(&payment.project_id, payment.chain_id)
                .await?;
            match address {
                Some(address) if !address.trim().is_empty() => resolved.push((payment, address)),
                _ => {
                    if !missing.contains(&payment.project_id) {
                        missing.push(payment.project_id.clone());
                    }
                }
            }
        }
        if !missing.is_empty() {
            return Err(DonationError::missing_payout_address(missing));
        }

        let mut prepared = Vec::with_capacity(resolved.len());
        for (index, (payment, address)) in resolved.into_iter().enumerate() {
            let checksummed = checksum_address(&address)
                .map_err(|_| DonationError::invalid_payout_address(payment.project_id.clone(), address.clone()))?;
            let amount = payment.amount_in_base_units()?;
            if amount.is_zero() {
                return Err(DonationError::validation(format!(
                    "Donation amount for project {} must be greater than zero",
                    payment.project_id
                )));
            }
            prepared.push(PreparedPayment {
                index,
                payment: payment.clone(),
                recipient: parse_address(&checksummed)?,
                amount,
            });
        }
        Ok(prepared)
    }

    async fn process_group(
        &self,
        execution_id: Uuid,
        owner: Address,
        group: &ChainGroup,
        outcome: &mut ChainOutcome,
    ) -> Result<(), DonationError> {
        let chain_id = group.chain_id;
        let indices = group.indices();
        self.ensure_chain(chain_id).await?;

        let contract = self.contracts.get(chain_id);
        if group.is_batch() {
            let spender = contract.ok_or_else(|| {
                DonationError::config(format!("No batch donation contract configured for chain {}", chain_id))
            })?;
            let payments: Vec<DonationPayment> = group.payments.iter().map(|p| p.payment.clone()).collect();
            let requirements = self.approvals.check_allowances(owner, spender, &payments).await?;
            if requirements.iter().any(|r| r.needs_approval) {
                self.update_records(&indices, |record| record.advance(TransferStatus::Approving))
                    .await?;
                outcome.approvals = self.approvals.execute_approvals(&requirements).await?;
            }
        }

        let call = build_transfer_call(group, contract)?;
        let tx_hash = self.wallet.write_contract(call).await?;
        outcome.tx_hash = Some(tx_hash);
        let explorer_url = tx_explorer_url(chain_id, &tx_hash);
        log::info!("Submitted {:?} on chain {}", tx_hash, chain_id);

        self.update_records(&indices, |record| {
            record.advance(TransferStatus::Submitted)?;
            record.tx_hash = Some(tx_hash);
            record.explorer_url = explorer_url.clone();
            record.advance(TransferStatus::Confirming)
        })
        .await?;

        let receipt = self.wallet.wait_for_transaction_receipt(chain_id, tx_hash).await?;
        if receipt.status == ReceiptStatus::Reverted {
            return Err(DonationError::reverted(chain_id, format!("{:?}", tx_hash)));
        }

        self.update_records(&indices, |record| record.advance(TransferStatus::Success))
            .await?;
        let mut confirmed = self.confirmed.write().await;
        let lines = confirmed.entry(execution_id).or_default();
        for prepared in &group.payments {
            lines.insert(prepared.payment.record_key());
        }
        Ok(())
    }

    /// Put the wallet on `chain_id` and confirm the client agrees.
    ///
    /// A stale client gets one more switch before giving up.
    async fn ensure_chain(&self, chain_id: u64) -> Result<(), DonationError> {
        if self.wallet.chain_id().await? != chain_id {
            log::info!("Switching wallet to chain {}", chain_id);
            self.wallet.switch_chain(chain_id).await?;
        }
        if self.chain_sync.validate_chain_sync(chain_id).await? {
            return Ok(());
        }

        log::warn!("Wallet client out of sync with chain {}, switching again", chain_id);
        self.wallet.switch_chain(chain_id).await?;
        if self.chain_sync.validate_chain_sync(chain_id).await? {
            return Ok(());
        }
        let actual = self.wallet.chain_id().await?;
        Err(DonationError::chain_mismatch(chain_id, actual))
    }

    async fn update_records<F>(&self, indices: &[usize], mut update: F) -> Result<(), DonationError>
    where
        F: FnMut(&mut TransferRecord) -> Result<(), DonationError>,
    {
        let mut records = self.records.write().await;
        for index in indices {
            let record = records
                .get_mut(*index)
                .ok_or_else(|| DonationError::internal(format!("No transfer record at {}", index)))?;
            update(record)?;
        }
        Ok(())
    }
}
