//! Turns configured swap legs into pipeline input.
//!
//! Amounts in the configuration are written in whole tokens ("0.01") and are
//! scaled by the token's decimals here. Decimals come from the configuration
//! when given and are otherwise read from the token contract.

use alloy::primitives::utils::{parse_units, ParseUnits};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use swapper_config::{ContractsConfig, SwapLegConfig};
use swapper_pool::PoolService;
use swapper_types::{Address, SwapIntent, SwapLeg, U256};
use tracing::debug;

/// Scales a human-readable amount by `decimals`.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
	match parse_units(amount.trim(), decimals)
		.map_err(|e| anyhow!("Invalid amount '{amount}': {e}"))?
	{
		ParseUnits::U256(value) => Ok(value),
		ParseUnits::I256(_) => bail!("Amount '{amount}' must not be negative"),
	}
}

fn token_address(contracts: &ContractsConfig, symbol: &str) -> Result<Address> {
	contracts
		.tokens
		.get(symbol)
		.map(|token| token.address)
		.with_context(|| format!("Unknown token '{symbol}'"))
}

/// Builds a leg from its configuration and known token decimals.
///
/// The deadline is set `deadline_window` from now.
pub fn leg_from_config(
	leg: &SwapLegConfig,
	contracts: &ContractsConfig,
	decimals: &HashMap<Address, u8>,
	deadline_window: Duration,
) -> Result<SwapLeg> {
	let pool = contracts
		.pools
		.get(&leg.pool)
		.with_context(|| format!("Unknown pool '{}'", leg.pool))?
		.address;
	let token_in = token_address(contracts, &leg.token_in)?;
	let token_out = token_address(contracts, &leg.token_out)?;

	let decimals_of = |token: Address, symbol: &str| {
		decimals
			.get(&token)
			.copied()
			.with_context(|| format!("Decimals of '{symbol}' are unknown"))
	};

	let amount_in = parse_amount(&leg.amount_in, decimals_of(token_in, &leg.token_in)?)?;
	let min_amount_out = match &leg.min_amount_out {
		Some(amount) => parse_amount(amount, decimals_of(token_out, &leg.token_out)?)?,
		None => U256::ZERO,
	};

	let mut intent = SwapIntent::new(token_in, token_out, amount_in)
		.with_min_amount_out(min_amount_out)
		.deadline_in(deadline_window);
	if let Some(recipient) = leg.recipient {
		intent = intent.with_recipient(recipient);
	}

	Ok(SwapLeg { pool, intent })
}

/// Resolves every configured leg, reading missing decimals from the chain.
///
/// Deadlines are computed last so the window is not spent on metadata reads.
pub async fn resolve_legs(
	legs: &[SwapLegConfig],
	contracts: &ContractsConfig,
	pools: &PoolService,
	deadline_window: Duration,
) -> Result<Vec<SwapLeg>> {
	let mut decimals = HashMap::new();
	for leg in legs {
		for symbol in [&leg.token_in, &leg.token_out] {
			let token = contracts
				.tokens
				.get(symbol)
				.with_context(|| format!("Unknown token '{symbol}'"))?;
			if decimals.contains_key(&token.address) {
				continue;
			}
			let value = match token.decimals {
				Some(value) => value,
				None => {
					let info = pools
						.read_token(token.address)
						.await
						.with_context(|| format!("Failed to read decimals of '{symbol}'"))?;
					debug!(
						token = %token.address,
						symbol = %info.symbol,
						decimals = info.decimals,
						"Read token metadata"
					);
					info.decimals
				}
			};
			decimals.insert(token.address, value);
		}
	}

	legs.iter()
		.map(|leg| leg_from_config(leg, contracts, &decimals, deadline_window))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use swapper_config::{PoolConfig, TokenConfig};
	use swapper_types::current_timestamp;

	const USDC: Address = Address::new([0xa0; 20]);
	const WETH: Address = Address::new([0xc0; 20]);
	const POOL: Address = Address::new([0x88; 20]);

	fn contracts() -> ContractsConfig {
		ContractsConfig {
			router: Address::new([0xe5; 20]),
			tokens: HashMap::from([
				(
					"USDC".to_string(),
					TokenConfig {
						address: USDC,
						decimals: Some(6),
					},
				),
				(
					"WETH".to_string(),
					TokenConfig {
						address: WETH,
						decimals: None,
					},
				),
			]),
			pools: HashMap::from([("usdc-weth".to_string(), PoolConfig { address: POOL })]),
		}
	}

	fn leg_config(amount_in: &str, min_amount_out: Option<&str>) -> SwapLegConfig {
		SwapLegConfig {
			pool: "usdc-weth".to_string(),
			token_in: "USDC".to_string(),
			token_out: "WETH".to_string(),
			amount_in: amount_in.to_string(),
			min_amount_out: min_amount_out.map(str::to_string),
			recipient: None,
		}
	}

	#[test]
	fn test_parse_amount_scales_by_decimals() {
		assert_eq!(parse_amount("100", 6).unwrap(), U256::from(100_000_000u64));
		assert_eq!(
			parse_amount("0.01", 18).unwrap(),
			U256::from(10_000_000_000_000_000u64)
		);
		assert!(parse_amount("-1", 6).is_err());
		assert!(parse_amount("abc", 6).is_err());
	}

	#[test]
	fn test_leg_from_config() {
		let decimals = HashMap::from([(USDC, 6u8), (WETH, 18u8)]);
		let leg = leg_from_config(
			&leg_config("100", Some("0.02")),
			&contracts(),
			&decimals,
			Duration::from_secs(600),
		)
		.unwrap();

		assert_eq!(leg.pool, POOL);
		assert_eq!(leg.intent.token_in, USDC);
		assert_eq!(leg.intent.token_out, WETH);
		assert_eq!(leg.intent.amount_in, U256::from(100_000_000u64));
		assert_eq!(
			leg.intent.min_amount_out,
			U256::from(20_000_000_000_000_000u64)
		);
		assert_eq!(leg.intent.recipient, None);
		assert!(leg.intent.deadline > current_timestamp());
	}

	#[test]
	fn test_missing_decimals_are_reported() {
		let decimals = HashMap::from([(USDC, 6u8)]);
		let err = leg_from_config(
			&leg_config("1", Some("1")),
			&contracts(),
			&decimals,
			Duration::from_secs(60),
		)
		.unwrap_err();
		assert!(err.to_string().contains("WETH"));

		// Output decimals are not needed without a minimum.
		assert!(leg_from_config(
			&leg_config("1", None),
			&contracts(),
			&decimals,
			Duration::from_secs(60)
		)
		.is_ok());
	}
}
