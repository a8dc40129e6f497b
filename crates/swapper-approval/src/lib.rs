//! ERC-20 allowance management.
//!
//! Before a swap is submitted the router must be allowed to pull the input
//! token. The manager reads the current allowance and, only when it falls
//! short, submits an `approve` and waits for it to confirm. The swap is never
//! attempted while an approval is outstanding.

use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use swapper_account::AccountInterface;
use swapper_delivery::{DeliveryError, DeliveryService};
use swapper_types::{
	truncate_hash, Address, ConfirmationTimeout, EncodedCall, Transaction, TransactionHash,
	TransactionReceipt, U256,
};
use thiserror::Error;
use tracing::{info, instrument};

pub mod implementations {
	pub mod rpc;
}

sol! {
	#[sol(rpc)]
	interface IERC20 {
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

/// Errors that can occur while ensuring an allowance.
#[derive(Debug, Error)]
pub enum ApprovalError {
	/// The current allowance could not be read.
	#[error("Failed to read allowance of {token}: {reason}")]
	ChainRead { token: Address, reason: String },
	/// The approval was refused by the wallet or reverted on chain.
	#[error("Approval of {token} rejected: {reason}")]
	Rejected { token: Address, reason: String },
	/// The approval was broadcast but did not confirm in time.
	#[error("Approval of {token} not confirmed ({hash}); outcome unknown")]
	Timeout { token: Address, hash: TransactionHash },
	/// The node failed while the approval receipt was awaited.
	#[error("Approval of {token} unconfirmed ({hash}): {reason}; outcome unknown")]
	Unconfirmed {
		token: Address,
		hash: TransactionHash,
		reason: String,
	},
	/// The approval could not be broadcast.
	#[error("Approval delivery failed: {0}")]
	Delivery(DeliveryError),
}

impl ApprovalError {
	/// True when an approval was broadcast but its fate is unknown.
	pub fn is_outcome_unknown(&self) -> bool {
		matches!(
			self,
			ApprovalError::Timeout { .. } | ApprovalError::Unconfirmed { .. }
		)
	}
}

/// Trait defining the token reads the manager needs.
#[async_trait]
pub trait TokenInterface: Send + Sync {
	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ApprovalError>;
}

/// How much to approve when the current allowance is insufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
	/// Approve exactly the required amount.
	Exact,
	/// Approve a multiple of the required amount to cover later swaps.
	Multiple(u64),
	/// Approve the maximum `uint256`.
	Unlimited,
}

impl ApprovalPolicy {
	/// Amount to approve for `required`; never less than `required`.
	pub fn amount_for(&self, required: U256) -> U256 {
		match self {
			ApprovalPolicy::Exact => required,
			ApprovalPolicy::Multiple(n) => required.saturating_mul(U256::from(*n)).max(required),
			ApprovalPolicy::Unlimited => U256::MAX,
		}
	}
}

/// Result of [`ApprovalManager::ensure_allowance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
	/// Nothing was submitted; the existing allowance covers the swap.
	AlreadySufficient { allowance: U256 },
	/// An approval was submitted and confirmed.
	Approved(TransactionReceipt),
}

/// Settings for approval transactions.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
	pub policy: ApprovalPolicy,
	/// Gas limit for `approve` transactions.
	pub gas_limit: u64,
	/// Fixed gas price; the node's price is used when unset.
	pub gas_price: Option<u128>,
	/// How long to wait for the approval receipt.
	pub timeout: ConfirmationTimeout,
}

/// Ensures spenders hold enough allowance before swaps are submitted.
pub struct ApprovalManager {
	token: Box<dyn TokenInterface>,
	delivery: Arc<DeliveryService>,
	config: ApprovalConfig,
}

impl ApprovalManager {
	pub fn new(
		token: Box<dyn TokenInterface>,
		delivery: Arc<DeliveryService>,
		config: ApprovalConfig,
	) -> Self {
		Self {
			token,
			delivery,
			config,
		}
	}

	/// Encodes `approve(spender, amount)` on `token`.
	pub fn encode_approval(token: Address, spender: Address, amount: U256) -> EncodedCall {
		EncodedCall::new(token, IERC20::approveCall { spender, amount }.abi_encode())
	}

	/// Makes sure `spender` may pull at least `required` of `token` from `owner`.
	///
	/// Returns once the allowance is known to be sufficient: immediately when it
	/// already is, otherwise after the approval transaction has confirmed.
	#[instrument(skip_all, fields(token = %token, spender = %spender))]
	pub async fn ensure_allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
		required: U256,
		account: &dyn AccountInterface,
	) -> Result<ApprovalOutcome, ApprovalError> {
		let allowance = self.token.allowance(token, owner, spender).await?;
		if allowance >= required {
			info!(%allowance, %required, "Allowance already sufficient");
			return Ok(ApprovalOutcome::AlreadySufficient { allowance });
		}

		let amount = self.config.policy.amount_for(required);
		info!(%allowance, %required, %amount, "Submitting approval");

		let chain_id = self
			.delivery
			.chain_id()
			.await
			.map_err(ApprovalError::Delivery)?;
		let mut tx = Transaction::from_call(
			Self::encode_approval(token, spender, amount),
			owner,
			chain_id,
		)
		.with_gas_limit(self.config.gas_limit);
		if let Some(gas_price) = self.config.gas_price {
			tx = tx.with_gas_price(gas_price);
		}

		let pending = self
			.delivery
			.submit(tx, account)
			.await
			.map_err(|e| match e {
				DeliveryError::Signing(reason) => ApprovalError::Rejected { token, reason },
				other => ApprovalError::Delivery(other),
			})?;

		match self.delivery.confirm(&pending, self.config.timeout).await {
			Ok(receipt) => {
				info!(tx_hash = %truncate_hash(&receipt.hash), "Approval confirmed");
				Ok(ApprovalOutcome::Approved(receipt))
			}
			Err(DeliveryError::Reverted(receipt)) => Err(ApprovalError::Rejected {
				token,
				reason: format!("approval reverted in block {}", receipt.block_number),
			}),
			Err(DeliveryError::ConfirmationTimeout { hash, .. }) => {
				Err(ApprovalError::Timeout { token, hash })
			}
			Err(DeliveryError::ConfirmationFailed { hash, reason }) => {
				Err(ApprovalError::Unconfirmed {
					token,
					hash,
					reason,
				})
			}
			Err(other) => Err(ApprovalError::Delivery(other)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::sync::Mutex;
	use std::time::Duration;
	use swapper_account::AccountError;
	use swapper_delivery::{DeliveryConfig, DeliveryInterface};
	use swapper_types::{Bytes, SignedTransaction, B256};

	const ROUTER: Address = Address::new([0xe5; 20]);
	const OWNER: Address = Address::new([0xf3; 20]);
	const USDC: Address = Address::new([0xa0; 20]);

	#[derive(Default)]
	struct Ledger {
		allowances: HashMap<(Address, Address, Address), U256>,
		approvals_sent: usize,
		revert_approvals: bool,
		fail_receipts: bool,
		receipts: HashMap<B256, bool>,
	}

	/// Token and chain backed by one shared ledger; approvals land instantly.
	struct MockChain {
		ledger: Arc<Mutex<Ledger>>,
	}

	#[async_trait]
	impl TokenInterface for MockChain {
		async fn allowance(
			&self,
			token: Address,
			owner: Address,
			spender: Address,
		) -> Result<U256, ApprovalError> {
			let ledger = self.ledger.lock().unwrap();
			Ok(ledger
				.allowances
				.get(&(token, owner, spender))
				.copied()
				.unwrap_or_default())
		}
	}

	#[async_trait]
	impl DeliveryInterface for MockChain {
		async fn chain_id(&self) -> Result<u64, DeliveryError> {
			Ok(1)
		}

		async fn nonce(&self, _address: Address) -> Result<u64, DeliveryError> {
			Ok(self.ledger.lock().unwrap().approvals_sent as u64)
		}

		async fn gas_price(&self) -> Result<u128, DeliveryError> {
			Ok(1)
		}

		async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TransactionHash, DeliveryError> {
			// The mock account "signs" by prefixing the token address to the calldata.
			let token = Address::from_slice(&raw[..20]);
			let call = IERC20::approveCall::abi_decode(&raw[20..])
				.map_err(|e| DeliveryError::Network(e.to_string()))?;

			let mut ledger = self.ledger.lock().unwrap();
			ledger.approvals_sent += 1;
			let hash = B256::with_last_byte(ledger.approvals_sent as u8);
			let succeed = !ledger.revert_approvals;
			if succeed {
				ledger
					.allowances
					.insert((token, OWNER, call.spender), call.amount);
			}
			ledger.receipts.insert(hash, succeed);
			Ok(hash)
		}

		async fn get_receipt(
			&self,
			hash: &TransactionHash,
		) -> Result<Option<TransactionReceipt>, DeliveryError> {
			let ledger = self.ledger.lock().unwrap();
			if ledger.fail_receipts {
				return Err(DeliveryError::Network("502 bad gateway".to_string()));
			}
			Ok(ledger.receipts.get(hash).map(|success| TransactionReceipt {
				hash: *hash,
				block_number: 10,
				block_hash: None,
				gas_used: 46_000,
				success: *success,
				logs: vec![],
			}))
		}

		async fn block_number(&self) -> Result<u64, DeliveryError> {
			Ok(10)
		}
	}

	struct MockAccount {
		refuse: bool,
	}

	#[async_trait]
	impl AccountInterface for MockAccount {
		async fn address(&self) -> Result<Address, AccountError> {
			Ok(OWNER)
		}

		async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError> {
			if self.refuse {
				return Err(AccountError::SigningFailed("user rejected".to_string()));
			}
			let mut raw = tx.to.to_vec();
			raw.extend_from_slice(&tx.data);
			Ok(SignedTransaction {
				hash: B256::ZERO,
				raw: raw.into(),
			})
		}
	}

	fn manager(ledger: Arc<Mutex<Ledger>>, policy: ApprovalPolicy) -> ApprovalManager {
		let delivery = DeliveryService::new(
			Box::new(MockChain {
				ledger: ledger.clone(),
			}),
			DeliveryConfig {
				poll_interval: Duration::from_millis(1),
			},
		);
		ApprovalManager::new(
			Box::new(MockChain { ledger }),
			Arc::new(delivery),
			ApprovalConfig {
				policy,
				gas_limit: 100_000,
				gas_price: None,
				timeout: ConfirmationTimeout::Blocks(3),
			},
		)
	}

	#[tokio::test]
	async fn test_second_call_is_a_no_op() {
		let ledger = Arc::new(Mutex::new(Ledger::default()));
		let manager = manager(ledger.clone(), ApprovalPolicy::Exact);
		let account = MockAccount { refuse: false };
		let required = U256::from(100_000_000u64);

		let first = manager
			.ensure_allowance(USDC, OWNER, ROUTER, required, &account)
			.await
			.unwrap();
		assert!(matches!(first, ApprovalOutcome::Approved(ref r) if r.success));

		let second = manager
			.ensure_allowance(USDC, OWNER, ROUTER, required, &account)
			.await
			.unwrap();
		assert_eq!(
			second,
			ApprovalOutcome::AlreadySufficient {
				allowance: required
			}
		);
		assert_eq!(ledger.lock().unwrap().approvals_sent, 1);
	}

	#[tokio::test]
	async fn test_policy_multiple_approves_headroom() {
		let ledger = Arc::new(Mutex::new(Ledger::default()));
		let manager = manager(ledger.clone(), ApprovalPolicy::Multiple(1000));
		let account = MockAccount { refuse: false };

		manager
			.ensure_allowance(USDC, OWNER, ROUTER, U256::from(10u64), &account)
			.await
			.unwrap();

		let allowance = ledger.lock().unwrap().allowances[&(USDC, OWNER, ROUTER)];
		assert_eq!(allowance, U256::from(10_000u64));
	}

	#[tokio::test]
	async fn test_reverted_approval_is_rejected() {
		let ledger = Arc::new(Mutex::new(Ledger {
			revert_approvals: true,
			..Default::default()
		}));
		let manager = manager(ledger, ApprovalPolicy::Exact);

		let err = manager
			.ensure_allowance(USDC, OWNER, ROUTER, U256::from(1u64), &MockAccount { refuse: false })
			.await
			.unwrap_err();
		assert!(matches!(err, ApprovalError::Rejected { token, .. } if token == USDC));
	}

	#[tokio::test]
	async fn test_wallet_refusal_is_rejected() {
		let ledger = Arc::new(Mutex::new(Ledger::default()));
		let manager = manager(ledger.clone(), ApprovalPolicy::Exact);

		let err = manager
			.ensure_allowance(USDC, OWNER, ROUTER, U256::from(1u64), &MockAccount { refuse: true })
			.await
			.unwrap_err();
		assert!(matches!(err, ApprovalError::Rejected { .. }));
		assert_eq!(ledger.lock().unwrap().approvals_sent, 0);
	}

	#[tokio::test]
	async fn test_lost_receipt_is_unconfirmed() {
		let ledger = Arc::new(Mutex::new(Ledger {
			fail_receipts: true,
			..Default::default()
		}));
		let manager = manager(ledger.clone(), ApprovalPolicy::Exact);

		let err = manager
			.ensure_allowance(USDC, OWNER, ROUTER, U256::from(1u64), &MockAccount { refuse: false })
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ApprovalError::Unconfirmed { token, hash, .. }
				if token == USDC && hash == B256::with_last_byte(1)
		));
		assert!(err.is_outcome_unknown());
		assert_eq!(ledger.lock().unwrap().approvals_sent, 1);
	}

	#[test]
	fn test_policy_amounts() {
		let required = U256::from(7u64);
		assert_eq!(ApprovalPolicy::Exact.amount_for(required), required);
		assert_eq!(ApprovalPolicy::Multiple(0).amount_for(required), required);
		assert_eq!(ApprovalPolicy::Unlimited.amount_for(required), U256::MAX);
		assert_eq!(
			ApprovalPolicy::Multiple(2).amount_for(U256::MAX),
			U256::MAX
		);
	}

	#[test]
	fn test_approval_selector() {
		let call = ApprovalManager::encode_approval(USDC, ROUTER, U256::from(1u64));
		assert_eq!(call.target, USDC);
		assert_eq!(&call.data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
	}
}
