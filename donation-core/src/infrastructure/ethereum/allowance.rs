//! ERC-20 allowance reads

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::TransactionRequest;
use crate::application::ports::AllowanceReader;
use crate::infrastructure::ethereum::{calldata, ChainProviders};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, U256};

pub struct EthersAllowanceReader {
    providers: ChainProviders,
}

impl EthersAllowanceReader {
    pub fn new(providers: ChainProviders) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl AllowanceReader for EthersAllowanceReader {
    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, DonationError> {
        let provider = self.providers.get(chain_id)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(token)
            .data(calldata::allowance(owner, spender))
            .into();
        let output = provider.call(&tx, None).await?;
        calldata::decode_uint(&output)
    }
}
