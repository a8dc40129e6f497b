//! JSON-RPC delivery backend built on an Alloy provider.
//!
//! Transactions arrive already signed, so the provider needs no wallet: it
//! only relays `eth_sendRawTransaction` and answers receipt and head queries.

use crate::{DeliveryError, DeliveryInterface};
use alloy::providers::{DynProvider, Provider};
use async_trait::async_trait;
use swapper_types::{Address, Bytes, TransactionHash, TransactionReceipt};

/// Delivery backend for EVM chains reachable over JSON-RPC.
pub struct RpcDelivery {
	provider: DynProvider,
}

impl RpcDelivery {
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}
}

#[async_trait]
impl DeliveryInterface for RpcDelivery {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get chain id: {}", e)))
	}

	async fn nonce(&self, address: Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TransactionHash, DeliveryError> {
		let pending = self
			.provider
			.send_raw_transaction(raw)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		Ok(*pending.tx_hash())
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(*hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: receipt.transaction_hash,
			block_number: receipt.block_number.unwrap_or(0),
			block_hash: receipt.block_hash,
			gas_used: receipt.gas_used,
			success: receipt.status(),
			logs: receipt
				.inner
				.logs()
				.iter()
				.map(|log| log.inner.clone())
				.collect(),
		}))
	}

	async fn block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}
}
