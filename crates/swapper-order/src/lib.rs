//! Swap construction for the swapper pipeline.
//!
//! This crate turns caller intents into router call parameters and encodes
//! them into calldata, optionally packed into a single `multicall`. Nothing
//! here talks to the chain: every function is pure and deterministic.

use alloy::sol;
use swapper_types::Address;
use thiserror::Error;

pub mod builder;
pub mod encoder;

pub use builder::SwapParamBuilder;
pub use encoder::{batch, decode_batch, SwapEncoder};

sol! {
	/// Uniswap V3 `SwapRouter` surface used by the pipeline.
	#[derive(Debug, PartialEq, Eq)]
	interface ISwapRouter {
		struct ExactInputSingleParams {
			address tokenIn;
			address tokenOut;
			uint24 fee;
			address recipient;
			uint256 deadline;
			uint256 amountIn;
			uint256 amountOutMinimum;
			uint160 sqrtPriceLimitX96;
		}

		function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);

		function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
	}
}

/// Errors raised while building or encoding swaps.
///
/// These are input errors: they are detected before any chain interaction and
/// retrying with the same input always fails the same way.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
	/// The intent's tokens are not the pool's token pair.
	#[error("Token pair {token_in}/{token_out} does not match pool {token0}/{token1}")]
	InvalidPair {
		token_in: Address,
		token_out: Address,
		token0: Address,
		token1: Address,
	},
	/// The input amount is zero.
	#[error("Amount in must be greater than zero")]
	ZeroAmount,
	/// The deadline is not strictly after the current time.
	#[error("Deadline {deadline} is not after current time {now}")]
	DeadlineExpired { deadline: u64, now: u64 },
	/// The pool fee does not fit the router's `uint24` fee field.
	#[error("Fee tier {0} out of range")]
	InvalidFee(u32),
	/// A batch was requested with no calls.
	#[error("Cannot batch an empty list of calls")]
	EmptyBatch,
	/// A batch mixed calls to different contracts.
	#[error("Batched calls must share one target: expected {expected}, found {found}")]
	HeterogeneousTarget { expected: Address, found: Address },
	/// Calldata could not be decoded as the expected call.
	#[error("Decoding failed: {0}")]
	Decode(String),
}
