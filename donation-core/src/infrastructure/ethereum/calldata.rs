//! ABI encoding for the calls the donation flow makes

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Bytes, TransactionRequest};
use ethers::utils::id;
use crate::application::ports::{BatchDonation, ContractCall};
use crate::shared::error::DonationError;
use crate::shared::types::{Address, U256};

pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
pub const APPROVE_SIGNATURE: &str = "approve(address,uint256)";
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";
pub const ALLOWANCE_SIGNATURE: &str = "allowance(address,address)";
/// Entries are (recipient, token, amount); token is the zero address for
/// the native asset, which travels as the call's value.
pub const BATCH_DONATE_SIGNATURE: &str = "batchDonate((address,address,uint256)[])";

fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data.into()
}

pub fn transfer(to: Address, amount: U256) -> Bytes {
    encode_call(TRANSFER_SIGNATURE, &[Token::Address(to), Token::Uint(amount)])
}

pub fn approve(spender: Address, amount: U256) -> Bytes {
    encode_call(APPROVE_SIGNATURE, &[Token::Address(spender), Token::Uint(amount)])
}

pub fn balance_of(owner: Address) -> Bytes {
    encode_call(BALANCE_OF_SIGNATURE, &[Token::Address(owner)])
}

pub fn allowance(owner: Address, spender: Address) -> Bytes {
    encode_call(ALLOWANCE_SIGNATURE, &[Token::Address(owner), Token::Address(spender)])
}

pub fn batch_donate(donations: &[BatchDonation]) -> Bytes {
    let entries = donations
        .iter()
        .map(|d| Token::Tuple(vec![Token::Address(d.recipient), Token::Address(d.token), Token::Uint(d.amount)]))
        .collect();
    encode_call(BATCH_DONATE_SIGNATURE, &[Token::Array(entries)])
}

/// Decode a single `uint256` return value
pub fn decode_uint(data: &[u8]) -> Result<U256, DonationError> {
    abi::decode(&[ParamType::Uint(256)], data)
        .map_err(|e| DonationError::network(format!("Unexpected call result: {}", e)))?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| DonationError::network("Call returned no uint256"))
}

/// Unsigned transaction for a contract call
pub fn transaction_request(call: &ContractCall) -> TransactionRequest {
    match call {
        ContractCall::Approve { chain_id, token, spender, amount } => TransactionRequest::new()
            .chain_id(*chain_id)
            .to(*token)
            .data(approve(*spender, *amount)),
        ContractCall::NativeTransfer { chain_id, to, amount } => TransactionRequest::new()
            .chain_id(*chain_id)
            .to(*to)
            .value(*amount),
        ContractCall::TokenTransfer { chain_id, token, to, amount } => TransactionRequest::new()
            .chain_id(*chain_id)
            .to(*token)
            .data(transfer(*to, *amount)),
        ContractCall::BatchDonate { chain_id, contract, donations, value } => {
            let request = TransactionRequest::new()
                .chain_id(*chain_id)
                .to(*contract)
                .data(batch_donate(donations));
            if value.is_zero() {
                request
            } else {
                request.value(*value)
            }
        }
    }
}
