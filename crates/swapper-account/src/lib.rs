//! Signing capability for the swapper pipeline.
//!
//! The pipeline never reads, derives or stores keys. It is handed an
//! `AccountInterface` and only ever asks it for its address and for signatures.

use async_trait::async_trait;
use swapper_types::{Address, SignedTransaction, Transaction};
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

/// Errors that can occur while using an account.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The signer refused or failed to produce a signature.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The key material could not be parsed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for signing accounts.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address transactions are sent from.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a fully populated transaction.
	///
	/// Nonce, gas limit and gas price must already be set; the account does not
	/// talk to the chain.
	async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError>;
}
