//! Pool and token snapshot types.

use alloy::primitives::{aliases::U160, Address};
use serde::{Deserialize, Serialize};

/// Parameters of a pool that never change after deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolImmutables {
	/// Lower-sorted token of the pair.
	pub token0: Address,
	/// Higher-sorted token of the pair.
	pub token1: Address,
	/// Fee tier in hundredths of a bip (e.g. 3000 = 0.3%).
	pub fee: u32,
	/// Factory that deployed the pool.
	pub factory: Address,
}

impl PoolImmutables {
	/// Returns true if `token` is one of the two pool tokens.
	pub fn contains(&self, token: Address) -> bool {
		token == self.token0 || token == self.token1
	}

	/// Returns true if `{a, b}` is exactly the pool's token pair, in either order.
	pub fn is_pair(&self, a: Address, b: Address) -> bool {
		(a == self.token0 && b == self.token1) || (a == self.token1 && b == self.token0)
	}
}

/// Volatile pool state as of the block the read was served from.
///
/// Never cached: the price and liquidity can move between any two reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
	/// Current sqrt(price) as a Q64.96 fixed point number.
	pub sqrt_price_x96: U160,
	/// In-range liquidity.
	pub liquidity: u128,
	/// Current tick.
	pub tick: i32,
}

/// ERC-20 metadata used to turn human amounts into base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}
