//! In-memory fakes shared by the unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use crate::application::ports::{
    AllowanceReader, BalanceSource, ChainSyncValidator, ContractCall, Notifier, WalletClient,
};
use crate::domain::entities::{
    find_token, DonationPayment, ReceiptStatus, TokenBalance, TransferReceipt,
};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, Notice, TxHash, U256};
use crate::shared::utils::parse_amount;

pub fn owner() -> Address {
    Address::from_low_u64_be(0xd0)
}

pub fn payout(n: u64) -> Address {
    Address::from_low_u64_be(0x1000 + n)
}

pub fn payment(project_id: &str, amount: &str, symbol: &str, chain_id: u64) -> DonationPayment {
    let token = find_token(symbol, chain_id)
        .unwrap_or_else(|| panic!("unknown token {}-{}", symbol, chain_id))
        .clone();
    DonationPayment::new(project_id, amount, token)
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub struct FakeBalanceSource {
    balances: Mutex<Result<Vec<(String, u64, String)>, String>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    requested: Mutex<Vec<Vec<u64>>>,
    every_chain: AtomicBool,
}

impl FakeBalanceSource {
    pub fn with_balances(balances: &[(&str, u64, &str)]) -> Self {
        Self {
            balances: Mutex::new(Ok(Self::owned(balances))),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            every_chain: AtomicBool::new(false),
        }
    }

    pub fn failing(message: &str) -> Self {
        let source = Self::with_balances(&[]);
        *source.balances.lock().unwrap() = Err(message.to_string());
        source
    }

    pub fn set_balances(&self, balances: &[(&str, u64, &str)]) {
        *self.balances.lock().unwrap() = Ok(Self::owned(balances));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Answer with every known balance, whatever chains were asked for
    pub fn return_every_chain(&self) {
        self.every_chain.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_chains(&self) -> Vec<Vec<u64>> {
        self.requested.lock().unwrap().clone()
    }

    fn owned(balances: &[(&str, u64, &str)]) -> Vec<(String, u64, String)> {
        balances
            .iter()
            .map(|(symbol, chain, amount)| (symbol.to_string(), *chain, amount.to_string()))
            .collect()
    }
}

#[async_trait]
impl BalanceSource for FakeBalanceSource {
    async fn get_all_tokens_across_chains(
        &self,
        _owner: Address,
        chain_ids: &[u64],
    ) -> Result<Vec<TokenBalance>, DonationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(chain_ids.to_vec());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let balances = self.balances.lock().unwrap().clone();
        let balances = balances.map_err(DonationError::network)?;
        let mut result = Vec::new();
        for (symbol, chain_id, amount) in balances {
            if !self.every_chain.load(Ordering::SeqCst) && !chain_ids.contains(&chain_id) {
                continue;
            }
            let token = find_token(&symbol, chain_id).unwrap().clone();
            let raw = parse_amount(&amount, token.decimals)?;
            result.push(TokenBalance::new(token, raw));
        }
        Ok(result)
    }
}

/// Allowances keyed by (chain, token); anything unset reads as zero
#[derive(Default)]
pub struct FixedAllowances {
    allowances: Mutex<HashMap<(u64, Address), U256>>,
}

impl FixedAllowances {
    pub fn set(&self, chain_id: u64, token: Address, amount: U256) {
        self.allowances.lock().unwrap().insert((chain_id, token), amount);
    }
}

#[async_trait]
impl AllowanceReader for FixedAllowances {
    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, DonationError> {
        Ok(self
            .allowances
            .lock()
            .unwrap()
            .get(&(chain_id, token))
            .copied()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    SwitchChain(u64),
    Write(ContractCall),
    WaitReceipt(u64, TxHash),
}

pub struct FakeWallet {
    account: Mutex<Option<Address>>,
    chain: Mutex<u64>,
    events: Mutex<Vec<WalletEvent>>,
    nonce: AtomicU64,
    sent: Mutex<HashMap<TxHash, (u64, bool)>>,
    revert_transfers_on: Mutex<HashSet<u64>>,
    reject_approvals_on: Mutex<HashSet<u64>>,
}

impl FakeWallet {
    pub fn connected(chain_id: u64) -> Self {
        Self {
            account: Mutex::new(Some(owner())),
            chain: Mutex::new(chain_id),
            events: Mutex::new(Vec::new()),
            nonce: AtomicU64::new(1),
            sent: Mutex::new(HashMap::new()),
            revert_transfers_on: Mutex::new(HashSet::new()),
            reject_approvals_on: Mutex::new(HashSet::new()),
        }
    }

    pub fn disconnect(&self) {
        *self.account.lock().unwrap() = None;
    }

    pub fn revert_transfers_on(&self, chain_id: u64) {
        self.revert_transfers_on.lock().unwrap().insert(chain_id);
    }

    pub fn reject_approvals_on(&self, chain_id: u64) {
        self.reject_approvals_on.lock().unwrap().insert(chain_id);
    }

    pub fn clear_failures(&self) {
        self.revert_transfers_on.lock().unwrap().clear();
        self.reject_approvals_on.lock().unwrap().clear();
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<ContractCall> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WalletEvent::Write(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn current_chain(&self) -> u64 {
        *self.chain.lock().unwrap()
    }
}

#[async_trait]
impl WalletClient for FakeWallet {
    async fn account(&self) -> Result<Option<Address>, DonationError> {
        Ok(*self.account.lock().unwrap())
    }

    async fn chain_id(&self) -> Result<u64, DonationError> {
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), DonationError> {
        self.events.lock().unwrap().push(WalletEvent::SwitchChain(chain_id));
        *self.chain.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn write_contract(&self, call: ContractCall) -> Result<TxHash, DonationError> {
        self.events.lock().unwrap().push(WalletEvent::Write(call.clone()));
        let chain_id = call.chain_id();
        if chain_id != self.current_chain() {
            return Err(DonationError::chain_mismatch(chain_id, self.current_chain()));
        }
        let is_approval = matches!(call, ContractCall::Approve { .. });
        if is_approval && self.reject_approvals_on.lock().unwrap().contains(&chain_id) {
            return Err(DonationError::user_rejected("User denied transaction signature"));
        }
        let hash = TxHash::from_low_u64_be(self.nonce.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().insert(hash, (chain_id, is_approval));
        Ok(hash)
    }

    async fn wait_for_transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> Result<TransferReceipt, DonationError> {
        self.events.lock().unwrap().push(WalletEvent::WaitReceipt(chain_id, tx_hash));
        let (sent_chain, is_approval) = self
            .sent
            .lock()
            .unwrap()
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| DonationError::network("unknown transaction"))?;
        let reverted = !is_approval && self.revert_transfers_on.lock().unwrap().contains(&sent_chain);
        Ok(TransferReceipt {
            transaction_hash: tx_hash,
            status: if reverted { ReceiptStatus::Reverted } else { ReceiptStatus::Success },
            block_number: Some(100),
        })
    }
}

/// Answers from a script, then reports in sync
#[derive(Default)]
pub struct ScriptedChainSync {
    answers: Mutex<VecDeque<bool>>,
    checks: Mutex<Vec<u64>>,
}

impl ScriptedChainSync {
    pub fn with_answers(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            checks: Mutex::new(Vec::new()),
        }
    }

    pub fn checks(&self) -> Vec<u64> {
        self.checks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainSyncValidator for ScriptedChainSync {
    async fn validate_chain_sync(&self, expected_chain_id: u64) -> Result<bool, DonationError> {
        self.checks.lock().unwrap().push(expected_chain_id);
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(true))
    }
}
