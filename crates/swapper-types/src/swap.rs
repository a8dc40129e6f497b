//! Swap intents, router call parameters and encoded calls.

use crate::utils::current_timestamp;
use alloy::primitives::{aliases::U160, Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A caller-specified exact-input swap.
///
/// Pricing policy stays with the caller: slippage is expressed only through
/// `min_amount_out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapIntent {
	/// Token sent to the pool.
	pub token_in: Address,
	/// Token received from the pool.
	pub token_out: Address,
	/// Exact input amount in the token's smallest unit.
	pub amount_in: U256,
	/// Minimum acceptable output; zero disables the slippage check.
	pub min_amount_out: U256,
	/// Receiver of the output tokens; the caller's own address when unset.
	pub recipient: Option<Address>,
	/// Absolute unix timestamp after which the router rejects the swap.
	pub deadline: u64,
	/// Relative deadline; when set, `deadline` is recomputed from it right
	/// before the swap is encoded.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deadline_window: Option<Duration>,
	/// Price bound for the swap; zero means unconstrained.
	pub sqrt_price_limit_x96: U160,
}

impl SwapIntent {
	/// Creates an intent with no slippage bound, no price limit and no deadline set.
	pub fn new(token_in: Address, token_out: Address, amount_in: U256) -> Self {
		Self {
			token_in,
			token_out,
			amount_in,
			min_amount_out: U256::ZERO,
			recipient: None,
			deadline: 0,
			deadline_window: None,
			sqrt_price_limit_x96: U160::ZERO,
		}
	}

	pub fn with_min_amount_out(mut self, min_amount_out: U256) -> Self {
		self.min_amount_out = min_amount_out;
		self
	}

	pub fn with_recipient(mut self, recipient: Address) -> Self {
		self.recipient = Some(recipient);
		self
	}

	/// Fixes the deadline to an absolute timestamp.
	pub fn with_deadline(mut self, deadline: u64) -> Self {
		self.deadline = deadline;
		self.deadline_window = None;
		self
	}

	/// Sets the deadline to `window` from the current clock.
	///
	/// The window is kept, so the deadline is measured again from the moment
	/// the swap is encoded, after any approvals have confirmed.
	pub fn deadline_in(mut self, window: Duration) -> Self {
		self.deadline = current_timestamp() + window.as_secs();
		self.deadline_window = Some(window);
		self
	}

	/// Deadline for a swap encoded at `now`.
	pub fn deadline_at(&self, now: u64) -> u64 {
		match self.deadline_window {
			Some(window) => now + window.as_secs(),
			None => self.deadline,
		}
	}

	pub fn with_sqrt_price_limit(mut self, limit: U160) -> Self {
		self.sqrt_price_limit_x96 = limit;
		self
	}
}

/// One leg of a swap: the pool to route through and what to swap in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapLeg {
	pub pool: Address,
	pub intent: SwapIntent,
}

/// Parameter record of the router's `exactInputSingle` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCallParams {
	pub token_in: Address,
	pub token_out: Address,
	pub fee: u32,
	pub recipient: Address,
	pub deadline: u64,
	pub amount_in: U256,
	pub amount_out_minimum: U256,
	pub sqrt_price_limit_x96: U160,
}

/// A single call against a contract, ready to be wrapped into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedCall {
	/// Contract receiving the call.
	pub target: Address,
	/// ABI-encoded calldata including the 4-byte selector.
	pub data: Bytes,
	/// Native currency attached to the call.
	pub value: U256,
}

impl EncodedCall {
	pub fn new(target: Address, data: impl Into<Bytes>) -> Self {
		Self {
			target,
			data: data.into(),
			value: U256::ZERO,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

/// Several calls to one contract packed into a single atomic call.
///
/// `data` is the encoding of the ordered inner payloads; either every inner call
/// succeeds or the whole transaction reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchedCall {
	pub target: Address,
	pub data: Bytes,
	pub value: U256,
	/// The inner calls, in execution order.
	pub calls: Vec<EncodedCall>,
}

impl From<BatchedCall> for EncodedCall {
	fn from(batch: BatchedCall) -> Self {
		EncodedCall {
			target: batch.target,
			data: batch.data,
			value: batch.value,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_deadline_window_is_measured_from_encoding_time() {
		let token_in = Address::repeat_byte(0xa0);
		let token_out = Address::repeat_byte(0xc0);

		let relative = SwapIntent::new(token_in, token_out, U256::from(1u64))
			.deadline_in(Duration::from_secs(600));
		assert_eq!(relative.deadline_at(2_000_000_000), 2_000_000_600);

		let fixed = relative.with_deadline(1_900_000_000);
		assert_eq!(fixed.deadline_window, None);
		assert_eq!(fixed.deadline_at(2_000_000_000), 1_900_000_000);
	}
}
