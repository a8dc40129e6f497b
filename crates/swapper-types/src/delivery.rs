//! Transaction delivery types.
//!
//! This module defines types related to blockchain transaction submission
//! and monitoring, including pending handles, receipts and the lifecycle
//! a broadcast transaction moves through.

use crate::account::Transaction;
use alloy::primitives::{Log, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Blockchain transaction hash.
pub type TransactionHash = B256;

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// The hash of that block, when the node reports it.
	pub block_hash: Option<B256>,
	/// Gas consumed by the transaction.
	pub gas_used: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Logs emitted during execution.
	pub logs: Vec<Log>,
}

/// Handle to a transaction that was broadcast but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
	pub hash: TransactionHash,
	/// The fully populated transaction that was signed.
	pub transaction: Transaction,
	/// Chain head at the moment of broadcast.
	pub submitted_at_block: u64,
}

/// How long `confirm` waits for a receipt before giving up on the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationTimeout {
	/// Give up once the chain head has advanced this many blocks past submission.
	Blocks(u64),
	/// Give up after this much wall-clock time.
	Duration(Duration),
}

impl fmt::Display for ConfirmationTimeout {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfirmationTimeout::Blocks(n) => write!(f, "{} blocks", n),
			ConfirmationTimeout::Duration(d) => write!(f, "{}s", d.as_secs()),
		}
	}
}

/// Lifecycle of a single transaction.
///
/// `Confirmed`, `Reverted` and `TimedOut` are terminal. `TimedOut` means the
/// outcome is unknown: the transaction may still be mined later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
	Built,
	Submitted,
	Confirmed,
	Reverted,
	TimedOut,
}

impl TransactionStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransactionStatus::Confirmed | TransactionStatus::Reverted | TransactionStatus::TimedOut
		)
	}
}

impl fmt::Display for TransactionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TransactionStatus::Built => "built",
			TransactionStatus::Submitted => "submitted",
			TransactionStatus::Confirmed => "confirmed",
			TransactionStatus::Reverted => "reverted",
			TransactionStatus::TimedOut => "timed-out",
		};
		f.write_str(s)
	}
}
