//! Transaction submission and confirmation.
//!
//! A transaction is signed and broadcast exactly once. There is no automatic
//! resubmission or gas price bumping: a transaction that does not confirm in
//! time is reported as timed out, and the caller decides what to do with it.
//!
//! Each transaction moves through `Built -> Submitted -> {Confirmed, Reverted,
//! TimedOut}`; the service keeps the latest status per hash for inspection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use swapper_account::AccountInterface;
use swapper_types::{
	truncate_hash, Address, Bytes, ConfirmationTimeout, PendingTransaction, Transaction,
	TransactionHash, TransactionReceipt, TransactionStatus,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub mod implementations {
	pub mod rpc;
}

/// Errors that can occur during delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The node could not be reached or refused the request.
	#[error("Network error: {0}")]
	Network(String),
	/// The account refused or failed to sign.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// The transaction is missing a field required for submission.
	#[error("Transaction not ready for submission: {0}")]
	Incomplete(&'static str),
	/// The transaction was mined but execution failed. Gas was spent.
	#[error("Transaction {} reverted in block {}", .0.hash, .0.block_number)]
	Reverted(Box<TransactionReceipt>),
	/// No receipt arrived in time. The transaction may still be mined.
	#[error("No receipt for {hash} within {timeout}; outcome unknown")]
	ConfirmationTimeout {
		hash: TransactionHash,
		timeout: ConfirmationTimeout,
	},
	/// The node failed while the receipt was awaited. The transaction was
	/// broadcast and may still be mined.
	#[error("Lost track of {hash} while awaiting its receipt: {reason}; outcome unknown")]
	ConfirmationFailed {
		hash: TransactionHash,
		reason: String,
	},
}

impl DeliveryError {
	/// True when the transaction was broadcast but its fate is unknown.
	pub fn is_outcome_unknown(&self) -> bool {
		matches!(
			self,
			DeliveryError::ConfirmationTimeout { .. } | DeliveryError::ConfirmationFailed { .. }
		)
	}

	/// Hash of the broadcast transaction the error refers to, if any.
	pub fn transaction_hash(&self) -> Option<TransactionHash> {
		match self {
			DeliveryError::Reverted(receipt) => Some(receipt.hash),
			DeliveryError::ConfirmationTimeout { hash, .. }
			| DeliveryError::ConfirmationFailed { hash, .. } => Some(*hash),
			_ => None,
		}
	}
}

/// Trait defining the chain surface needed to broadcast and track transactions.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Chain ID the node serves.
	async fn chain_id(&self) -> Result<u64, DeliveryError>;

	/// Next nonce for `address`, including pending transactions.
	async fn nonce(&self, address: Address) -> Result<u64, DeliveryError>;

	/// Current legacy gas price in wei.
	async fn gas_price(&self) -> Result<u128, DeliveryError>;

	/// Broadcasts a signed transaction.
	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TransactionHash, DeliveryError>;

	/// Receipt for `hash`, or `None` while it is not mined.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Current chain head.
	async fn block_number(&self) -> Result<u64, DeliveryError>;
}

/// Delivery settings.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
	/// Delay between receipt polls.
	pub poll_interval: Duration,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(2),
		}
	}
}

/// Signs, broadcasts and confirms transactions through a delivery backend.
pub struct DeliveryService {
	backend: Box<dyn DeliveryInterface>,
	config: DeliveryConfig,
	statuses: Arc<RwLock<HashMap<TransactionHash, TransactionStatus>>>,
}

impl DeliveryService {
	pub fn new(backend: Box<dyn DeliveryInterface>, config: DeliveryConfig) -> Self {
		Self {
			backend,
			config,
			statuses: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Chain ID of the connected node.
	pub async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.backend.chain_id().await
	}

	/// Current gas price, used when the caller did not fix one.
	pub async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.backend.gas_price().await
	}

	/// Latest known status of a transaction submitted through this service.
	pub async fn status(&self, hash: &TransactionHash) -> Option<TransactionStatus> {
		self.statuses.read().await.get(hash).copied()
	}

	async fn set_status(&self, hash: TransactionHash, status: TransactionStatus) {
		debug!(tx_hash = %truncate_hash(&hash), %status, "Transaction status changed");
		self.statuses.write().await.insert(hash, status);
	}

	/// Signs `tx` with `account` and broadcasts it once.
	///
	/// The gas limit must be set by the caller. Nonce and gas price are filled
	/// from the node when unset.
	pub async fn submit(
		&self,
		mut tx: Transaction,
		account: &dyn AccountInterface,
	) -> Result<PendingTransaction, DeliveryError> {
		if tx.gas_limit.is_none() {
			return Err(DeliveryError::Incomplete("gas limit"));
		}

		let from = account
			.address()
			.await
			.map_err(|e| DeliveryError::Signing(e.to_string()))?;
		tx.from = from;

		if tx.nonce.is_none() {
			tx.nonce = Some(self.backend.nonce(from).await?);
		}
		if tx.gas_price.is_none() {
			tx.gas_price = Some(self.backend.gas_price().await?);
		}

		let signed = account
			.sign_transaction(&tx)
			.await
			.map_err(|e| DeliveryError::Signing(e.to_string()))?;
		self.set_status(signed.hash, TransactionStatus::Built).await;

		let submitted_at_block = self.backend.block_number().await?;
		let hash = self.backend.send_raw_transaction(&signed.raw).await?;
		if hash != signed.hash {
			warn!(
				expected = %truncate_hash(&signed.hash),
				reported = %truncate_hash(&hash),
				"Node reported a different transaction hash"
			);
		}
		self.set_status(hash, TransactionStatus::Submitted).await;

		info!(
			tx_hash = %truncate_hash(&hash),
			nonce = tx.nonce.unwrap_or_default(),
			gas_limit = tx.gas_limit.unwrap_or_default(),
			block = submitted_at_block,
			"Submitted transaction"
		);

		Ok(PendingTransaction {
			hash,
			transaction: tx,
			submitted_at_block,
		})
	}

	/// Waits for `pending` to be mined.
	///
	/// Returns the receipt on success, `Reverted` if execution failed and
	/// `ConfirmationTimeout` if no receipt arrived in time. A node failure while
	/// polling ends the wait with `ConfirmationFailed`. Neither affects the
	/// broadcast itself.
	pub async fn confirm(
		&self,
		pending: &PendingTransaction,
		timeout: ConfirmationTimeout,
	) -> Result<TransactionReceipt, DeliveryError> {
		let hash = pending.hash;
		let started = Instant::now();

		info!(
			tx_hash = %truncate_hash(&hash),
			%timeout,
			"Waiting for confirmation"
		);

		loop {
			let receipt = match self.backend.get_receipt(&hash).await {
				Ok(receipt) => receipt,
				Err(e) => return Err(self.lost(hash, e).await),
			};
			if let Some(receipt) = receipt {
				if receipt.success {
					self.set_status(hash, TransactionStatus::Confirmed).await;
					info!(
						tx_hash = %truncate_hash(&hash),
						block = receipt.block_number,
						gas_used = receipt.gas_used,
						"Transaction confirmed"
					);
					return Ok(receipt);
				}

				self.set_status(hash, TransactionStatus::Reverted).await;
				error!(
					tx_hash = %truncate_hash(&hash),
					block = receipt.block_number,
					"Transaction reverted"
				);
				return Err(DeliveryError::Reverted(Box::new(receipt)));
			}

			let expired = match timeout {
				ConfirmationTimeout::Blocks(blocks) => {
					let head = match self.backend.block_number().await {
						Ok(head) => head,
						Err(e) => return Err(self.lost(hash, e).await),
					};
					head.saturating_sub(pending.submitted_at_block) >= blocks
				}
				ConfirmationTimeout::Duration(limit) => started.elapsed() >= limit,
			};

			if expired {
				self.set_status(hash, TransactionStatus::TimedOut).await;
				warn!(
					tx_hash = %truncate_hash(&hash),
					%timeout,
					"Gave up waiting for receipt; transaction may still be mined"
				);
				return Err(DeliveryError::ConfirmationTimeout { hash, timeout });
			}

			tokio::time::sleep(self.config.poll_interval).await;
		}
	}

	/// Ends a wait that failed after broadcast, keeping the hash.
	async fn lost(&self, hash: TransactionHash, error: DeliveryError) -> DeliveryError {
		self.set_status(hash, TransactionStatus::TimedOut).await;
		error!(
			tx_hash = %truncate_hash(&hash),
			error = %error,
			"Receipt polling failed; transaction may still be mined"
		);
		DeliveryError::ConfirmationFailed {
			hash,
			reason: error.to_string(),
		}
	}
}
