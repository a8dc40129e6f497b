//! Calldata encoding for router swaps.
//!
//! Encoding is a pure function of its inputs: identical parameters always
//! produce identical bytes, which is what the router executes against.

use crate::{ISwapRouter, OrderError};
use alloy::primitives::aliases::U24;
use alloy::sol_types::SolCall;
use swapper_types::{Address, BatchedCall, Bytes, EncodedCall, SwapCallParams, U256};
use tracing::debug;

/// Encodes swaps against a single router contract.
#[derive(Debug, Clone)]
pub struct SwapEncoder {
	router: Address,
}

impl SwapEncoder {
	pub fn new(router: Address) -> Self {
		Self { router }
	}

	pub fn router(&self) -> Address {
		self.router
	}

	/// Encodes `params` as an `exactInputSingle` call to the router.
	pub fn encode(&self, params: &SwapCallParams) -> EncodedCall {
		let call = ISwapRouter::exactInputSingleCall {
			params: ISwapRouter::ExactInputSingleParams {
				tokenIn: params.token_in,
				tokenOut: params.token_out,
				fee: U24::from(params.fee),
				recipient: params.recipient,
				deadline: U256::from(params.deadline),
				amountIn: params.amount_in,
				amountOutMinimum: params.amount_out_minimum,
				sqrtPriceLimitX96: params.sqrt_price_limit_x96,
			},
		};

		EncodedCall::new(self.router, call.abi_encode())
	}

	/// Decodes an `exactInputSingle` call back into its parameter record.
	pub fn decode(&self, call: &EncodedCall) -> Result<SwapCallParams, OrderError> {
		let decoded = ISwapRouter::exactInputSingleCall::abi_decode(&call.data)
			.map_err(|e| OrderError::Decode(e.to_string()))?;
		let p = decoded.params;

		Ok(SwapCallParams {
			token_in: p.tokenIn,
			token_out: p.tokenOut,
			fee: p.fee.to::<u32>(),
			recipient: p.recipient,
			deadline: p.deadline.saturating_to::<u64>(),
			amount_in: p.amountIn,
			amount_out_minimum: p.amountOutMinimum,
			sqrt_price_limit_x96: p.sqrtPriceLimitX96,
		})
	}
}

/// Packs `calls` into one `multicall(bytes[])` call, preserving order.
///
/// Every call must target the same contract; the attached values are summed.
pub fn batch(calls: &[EncodedCall]) -> Result<BatchedCall, OrderError> {
	let first = calls.first().ok_or(OrderError::EmptyBatch)?;

	if let Some(other) = calls.iter().find(|c| c.target != first.target) {
		return Err(OrderError::HeterogeneousTarget {
			expected: first.target,
			found: other.target,
		});
	}

	let payloads: Vec<Bytes> = calls.iter().map(|c| c.data.clone()).collect();
	let value = calls
		.iter()
		.fold(U256::ZERO, |acc, c| acc.saturating_add(c.value));
	let data = ISwapRouter::multicallCall { data: payloads }.abi_encode();

	debug!(
		target = %first.target,
		calls = calls.len(),
		bytes = data.len(),
		"Encoded multicall batch"
	);

	Ok(BatchedCall {
		target: first.target,
		data: data.into(),
		value,
		calls: calls.to_vec(),
	})
}

/// Unpacks a `multicall` payload into the calls it wraps.
///
/// The inner calls inherit the batch target; per-call values are not part of
/// the encoding and come back as zero.
pub fn decode_batch(target: Address, data: &[u8]) -> Result<Vec<EncodedCall>, OrderError> {
	let decoded =
		ISwapRouter::multicallCall::abi_decode(data).map_err(|e| OrderError::Decode(e.to_string()))?;

	Ok(decoded
		.data
		.into_iter()
		.map(|payload| EncodedCall::new(target, payload))
		.collect())
}
