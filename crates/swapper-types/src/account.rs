//! Transaction types handed to accounts for signing.
//!
//! A `Transaction` is the pipeline's transaction request: built from exactly one
//! encoded call, then completed with nonce and gas fields right before signing.

use crate::swap::EncodedCall;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use serde::{Deserialize, Serialize};

/// Blockchain transaction representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Recipient contract.
	pub to: Address,
	/// Sender; the signing account's address.
	pub from: Address,
	/// Transaction data/calldata.
	pub data: Bytes,
	/// Value to transfer in native currency.
	pub value: U256,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Transaction nonce (filled at submission when unset).
	pub nonce: Option<u64>,
	/// Gas limit for transaction execution.
	pub gas_limit: Option<u64>,
	/// Legacy gas price (filled from the node when unset).
	pub gas_price: Option<u128>,
}

impl Transaction {
	/// Builds a transaction request for a single encoded call.
	pub fn from_call(call: EncodedCall, from: Address, chain_id: u64) -> Self {
		Self {
			to: call.target,
			from,
			data: call.data,
			value: call.value,
			chain_id,
			nonce: None,
			gas_limit: None,
			gas_price: None,
		}
	}

	pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}

	pub fn with_gas_price(mut self, gas_price: u128) -> Self {
		self.gas_price = Some(gas_price);
		self
	}
}

/// Conversion from our Transaction type to Alloy's TransactionRequest.
impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		TransactionRequest {
			from: Some(tx.from),
			to: Some(TxKind::Call(tx.to)),
			chain_id: Some(tx.chain_id),
			value: Some(tx.value),
			nonce: tx.nonce,
			gas: tx.gas_limit,
			gas_price: tx.gas_price,
			input: TransactionInput::new(tx.data),
			..Default::default()
		}
	}
}

/// A signed, RLP/EIP-2718 encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	/// Hash the network will know the transaction by.
	pub hash: B256,
	/// Raw encoded bytes for `eth_sendRawTransaction`.
	pub raw: Bytes,
}
