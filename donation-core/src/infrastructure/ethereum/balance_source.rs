//! Multi-chain balance reads over JSON-RPC

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::TransactionRequest;
use futures::future::join_all;
use crate::application::ports::BalanceSource;
use crate::domain::entities::{tokens_for_chain, TokenBalance};
use crate::infrastructure::ethereum::{calldata, ChainProviders};
use crate::shared::error::DonationError;
use crate::shared::types::Address;
use crate::shared::utils::parse_address;

/// Reads the native balance and every registered ERC-20 per chain.
///
/// Chains are queried concurrently. A chain that fails is left out of the
/// result; only when every chain fails is the whole read an error.
pub struct EthersBalanceSource {
    providers: ChainProviders,
}

impl EthersBalanceSource {
    pub fn new(providers: ChainProviders) -> Self {
        Self { providers }
    }

    async fn chain_balances(
        provider: &Provider<Http>,
        owner: Address,
        chain_id: u64,
    ) -> Result<Vec<TokenBalance>, DonationError> {
        let mut balances = Vec::new();
        for token in tokens_for_chain(chain_id) {
            let raw = if token.is_native {
                provider.get_balance(owner, None).await?
            } else {
                let request = TransactionRequest::new()
                    .to(parse_address(&token.address)?)
                    .data(calldata::balance_of(owner));
                let tx: TypedTransaction = request.into();
                let output = provider.call(&tx, None).await?;
                calldata::decode_uint(&output)?
            };
            balances.push(TokenBalance::new(token.clone(), raw));
        }
        Ok(balances)
    }
}

#[async_trait]
impl BalanceSource for EthersBalanceSource {
    async fn get_all_tokens_across_chains(
        &self,
        owner: Address,
        chain_ids: &[u64],
    ) -> Result<Vec<TokenBalance>, DonationError> {
        let lookups = chain_ids.iter().map(|chain_id| async move {
            let result = match self.providers.get(*chain_id) {
                Ok(provider) => Self::chain_balances(&provider, owner, *chain_id).await,
                Err(err) => Err(err),
            };
            (*chain_id, result)
        });

        let mut balances = Vec::new();
        let mut failures = Vec::new();
        for (chain_id, result) in join_all(lookups).await {
            match result {
                Ok(chain_balances) => balances.extend(chain_balances),
                Err(err) => {
                    log::warn!("Balance lookup failed on chain {}: {}", chain_id, err);
                    failures.push((chain_id, err));
                }
            }
        }

        if !chain_ids.is_empty() && failures.len() == chain_ids.len() {
            let (chain_id, err) = &failures[0];
            return Err(DonationError::network(format!(
                "Balance lookup failed on every chain (first: chain {}: {})",
                chain_id, err
            )));
        }
        Ok(balances)
    }
}
