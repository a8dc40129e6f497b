//! Swap parameter building.
//!
//! Validates a `SwapIntent` against the pool it is routed through and produces
//! the `exactInputSingle` parameter record. No price or slippage math happens
//! here; the caller's `min_amount_out` is passed through untouched.

use crate::OrderError;
use swapper_types::{
	current_timestamp, Address, PoolImmutables, PoolState, SwapCallParams, SwapIntent, U256,
};
use tracing::debug;

/// Largest value representable in the router's `uint24` fee field.
const MAX_FEE: u32 = (1 << 24) - 1;

/// Builds router call parameters from intents and pool snapshots.
#[derive(Debug, Clone, Default)]
pub struct SwapParamBuilder;

impl SwapParamBuilder {
	pub fn new() -> Self {
		Self
	}

	/// Checks what can be validated without pool data.
	///
	/// Rejects a zero input, identical tokens and a deadline that is not after `now`.
	pub fn check_intent_at(&self, intent: &SwapIntent, now: u64) -> Result<(), OrderError> {
		if intent.amount_in == U256::ZERO {
			return Err(OrderError::ZeroAmount);
		}

		if intent.deadline <= now {
			return Err(OrderError::DeadlineExpired {
				deadline: intent.deadline,
				now,
			});
		}

		if intent.token_in == intent.token_out {
			return Err(OrderError::InvalidPair {
				token_in: intent.token_in,
				token_out: intent.token_out,
				token0: Address::ZERO,
				token1: Address::ZERO,
			});
		}

		Ok(())
	}

	/// Builds parameters for `intent`, validating against the current clock.
	///
	/// `caller` becomes the recipient when the intent does not name one.
	pub fn build_params(
		&self,
		intent: &SwapIntent,
		caller: Address,
		immutables: &PoolImmutables,
		state: &PoolState,
	) -> Result<SwapCallParams, OrderError> {
		self.build_params_at(intent, caller, immutables, state, current_timestamp())
	}

	/// Same as [`build_params`](Self::build_params) with an explicit `now`.
	pub fn build_params_at(
		&self,
		intent: &SwapIntent,
		caller: Address,
		immutables: &PoolImmutables,
		state: &PoolState,
		now: u64,
	) -> Result<SwapCallParams, OrderError> {
		self.check_intent_at(intent, now)?;

		if !immutables.is_pair(intent.token_in, intent.token_out) {
			return Err(OrderError::InvalidPair {
				token_in: intent.token_in,
				token_out: intent.token_out,
				token0: immutables.token0,
				token1: immutables.token1,
			});
		}

		if immutables.fee > MAX_FEE {
			return Err(OrderError::InvalidFee(immutables.fee));
		}

		let recipient = intent.recipient.unwrap_or(caller);

		debug!(
			token_in = %intent.token_in,
			token_out = %intent.token_out,
			fee = immutables.fee,
			tick = state.tick,
			liquidity = state.liquidity,
			"Built swap parameters"
		);

		Ok(SwapCallParams {
			token_in: intent.token_in,
			token_out: intent.token_out,
			fee: immutables.fee,
			recipient,
			deadline: intent.deadline,
			amount_in: intent.amount_in,
			amount_out_minimum: intent.min_amount_out,
			sqrt_price_limit_x96: intent.sqrt_price_limit_x96,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::address;
	use swapper_types::U160;

	const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
	const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
	const UNI: Address = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
	const WALLET: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const NOW: u64 = 1_700_000_000;

	fn usdc_weth_pool() -> PoolImmutables {
		PoolImmutables {
			token0: USDC,
			token1: WETH,
			fee: 10000,
			factory: address!("1F98431c8aD98523631AE4a59f267346ea31F984"),
		}
	}

	fn state() -> PoolState {
		PoolState {
			sqrt_price_x96: U160::from(1u128 << 96),
			liquidity: 5_000_000_000,
			tick: 200_000,
		}
	}

	#[test]
	fn test_usdc_to_weth_scenario() {
		let intent = SwapIntent::new(USDC, WETH, U256::from(100_000_000u64)).with_deadline(NOW + 600);

		let params = SwapParamBuilder::new()
			.build_params_at(&intent, WALLET, &usdc_weth_pool(), &state(), NOW)
			.unwrap();

		assert_eq!(params.token_in, USDC);
		assert_eq!(params.token_out, WETH);
		assert_eq!(params.fee, 10000);
		assert_eq!(params.amount_in, U256::from(100_000_000u64));
		assert_eq!(params.amount_out_minimum, U256::ZERO);
		assert_eq!(params.recipient, WALLET);
		assert_eq!(params.deadline, NOW + 600);
	}

	#[test]
	fn test_pair_is_order_independent() {
		let builder = SwapParamBuilder::new();
		let pool = usdc_weth_pool();

		for (token_in, token_out) in [(USDC, WETH), (WETH, USDC)] {
			let intent =
				SwapIntent::new(token_in, token_out, U256::from(1u64)).with_deadline(NOW + 1);
			let params = builder
				.build_params_at(&intent, WALLET, &pool, &state(), NOW)
				.unwrap();
			assert!(pool.is_pair(params.token_in, params.token_out));
			assert_eq!(params.token_in, token_in);
		}
	}

	#[test]
	fn test_rejects_token_outside_pool() {
		let intent = SwapIntent::new(WETH, UNI, U256::from(1u64)).with_deadline(NOW + 600);
		let err = SwapParamBuilder::new()
			.build_params_at(&intent, WALLET, &usdc_weth_pool(), &state(), NOW)
			.unwrap_err();
		assert!(matches!(err, OrderError::InvalidPair { .. }));

		let same = SwapIntent::new(USDC, USDC, U256::from(1u64)).with_deadline(NOW + 600);
		assert!(matches!(
			SwapParamBuilder::new().build_params_at(&same, WALLET, &usdc_weth_pool(), &state(), NOW),
			Err(OrderError::InvalidPair { .. })
		));
	}

	#[test]
	fn test_rejects_zero_amount_and_stale_deadline() {
		let builder = SwapParamBuilder::new();
		let pool = usdc_weth_pool();

		let zero = SwapIntent::new(USDC, WETH, U256::ZERO).with_deadline(NOW + 600);
		assert_eq!(
			builder.build_params_at(&zero, WALLET, &pool, &state(), NOW),
			Err(OrderError::ZeroAmount)
		);

		let stale = SwapIntent::new(USDC, WETH, U256::from(1u64)).with_deadline(NOW);
		assert_eq!(
			builder.build_params_at(&stale, WALLET, &pool, &state(), NOW),
			Err(OrderError::DeadlineExpired {
				deadline: NOW,
				now: NOW
			})
		);
	}

	#[test]
	fn test_explicit_recipient_is_kept() {
		let recipient = Address::repeat_byte(0x42);
		let intent = SwapIntent::new(USDC, WETH, U256::from(5u64))
			.with_recipient(recipient)
			.with_min_amount_out(U256::from(3u64))
			.with_deadline(NOW + 60);

		let params = SwapParamBuilder::new()
			.build_params_at(&intent, WALLET, &usdc_weth_pool(), &state(), NOW)
			.unwrap();
		assert_eq!(params.recipient, recipient);
		assert_eq!(params.amount_out_minimum, U256::from(3u64));
	}
}
