//! Account provider implementations.
//!
//! This module provides a local private key wallet built on Alloy's signer.
//! Swaps are sent as legacy (EIP-155) transactions since the pipeline prices
//! gas with a single gas price.

use crate::{AccountError, AccountInterface};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSigner;
use alloy::primitives::TxKind;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use swapper_types::{Address, SignedTransaction, Transaction};

/// Local wallet implementation using Alloy's signer.
///
/// The key is supplied by the caller (typically from the environment); the
/// wallet keeps it in memory only.
pub struct LocalWallet {
	/// The underlying Alloy signer that handles cryptographic operations.
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a new LocalWallet from a hex-encoded private key.
	///
	/// The private key should be provided as a hex string (with or without 0x prefix).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let key_without_prefix = private_key_hex
			.strip_prefix("0x")
			.unwrap_or(private_key_hex);

		if key_without_prefix.len() != 64 || hex::decode(key_without_prefix).is_err() {
			return Err(AccountError::InvalidKey(
				"Private key must be 64 hex characters (32 bytes)".to_string(),
			));
		}

		let signer = key_without_prefix
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError> {
		let nonce = tx
			.nonce
			.ok_or_else(|| AccountError::SigningFailed("Transaction nonce not set".to_string()))?;
		let gas_limit = tx.gas_limit.ok_or_else(|| {
			AccountError::SigningFailed("Transaction gas limit not set".to_string())
		})?;
		let gas_price = tx.gas_price.ok_or_else(|| {
			AccountError::SigningFailed("Transaction gas price not set".to_string())
		})?;

		if tx.from != self.signer.address() {
			return Err(AccountError::SigningFailed(format!(
				"Transaction sender {} does not match wallet {}",
				tx.from,
				self.signer.address()
			)));
		}

		let mut legacy_tx = TxLegacy {
			chain_id: Some(tx.chain_id),
			nonce,
			gas_price,
			gas_limit,
			to: TxKind::Call(tx.to),
			value: tx.value,
			input: tx.data.clone(),
		};

		let signature = self
			.signer
			.sign_transaction(&mut legacy_tx)
			.await
			.map_err(|e| {
				AccountError::SigningFailed(format!("Failed to sign transaction: {}", e))
			})?;

		let envelope = TxEnvelope::from(legacy_tx.into_signed(signature));

		Ok(SignedTransaction {
			hash: *envelope.tx_hash(),
			raw: envelope.encoded_2718().into(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{address, keccak256, Bytes, U256};

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn populated_tx(from: Address) -> Transaction {
		Transaction {
			to: address!("E592427A0AEce92De3Edee1F18E0157C05861564"),
			from,
			data: Bytes::from(vec![0xac, 0x96, 0x50, 0xd8]),
			value: U256::ZERO,
			chain_id: 1,
			nonce: Some(7),
			gas_limit: Some(4_000_000),
			gas_price: Some(30_000_000_000),
		}
	}

	#[tokio::test]
	async fn test_local_wallet_address() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		assert_eq!(
			wallet.address().await.unwrap(),
			address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}

	#[test]
	fn test_rejects_malformed_key() {
		assert!(matches!(
			LocalWallet::new("0x1234"),
			Err(AccountError::InvalidKey(_))
		));
		assert!(LocalWallet::new(&"zz".repeat(32)).is_err());
	}

	#[tokio::test]
	async fn test_sign_transaction_hash_matches_raw() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		let from = wallet.address().await.unwrap();

		let signed = wallet.sign_transaction(&populated_tx(from)).await.unwrap();
		assert_eq!(signed.hash, keccak256(&signed.raw));
		// Legacy transactions are a bare RLP list.
		assert!(signed.raw[0] >= 0xc0);

		let again = wallet.sign_transaction(&populated_tx(from)).await.unwrap();
		assert_eq!(signed, again);
	}

	#[tokio::test]
	async fn test_sign_requires_populated_fields() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		let from = wallet.address().await.unwrap();

		let mut tx = populated_tx(from);
		tx.nonce = None;
		assert!(matches!(
			wallet.sign_transaction(&tx).await,
			Err(AccountError::SigningFailed(_))
		));

		let tx = populated_tx(Address::ZERO);
		assert!(wallet.sign_transaction(&tx).await.is_err());
	}
}
