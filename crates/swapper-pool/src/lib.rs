//! Pool state reading for the swapper pipeline.
//!
//! Reads are always served from the current chain head and are never cached or
//! retried here: a transient RPC failure is surfaced to the caller rather than
//! masked, so stale state is never silently used to build a swap.

use async_trait::async_trait;
use swapper_types::{Address, PoolImmutables, PoolState, TokenInfo};
use thiserror::Error;
use tracing::{debug, instrument};

pub mod implementations {
	pub mod rpc;
}

/// Errors that can occur while reading pool or token data.
#[derive(Debug, Error)]
pub enum PoolError {
	/// The node could not serve a read.
	#[error("Chain read failed for {target} ({call}): {reason}")]
	ChainRead {
		/// Contract that was being read.
		target: Address,
		/// Name of the read that failed.
		call: &'static str,
		reason: String,
	},
}

/// Trait defining the read-only chain surface needed from pools and tokens.
#[async_trait]
pub trait PoolReaderInterface: Send + Sync {
	/// Reads the parameters fixed at pool deployment.
	async fn read_immutables(&self, pool: Address) -> Result<PoolImmutables, PoolError>;

	/// Reads the pool's current price, liquidity and tick.
	async fn read_state(&self, pool: Address) -> Result<PoolState, PoolError>;

	/// Reads ERC-20 metadata for a token.
	async fn read_token(&self, token: Address) -> Result<TokenInfo, PoolError>;
}

/// Service wrapper around a pool reader implementation.
pub struct PoolService {
	reader: Box<dyn PoolReaderInterface>,
}

impl PoolService {
	pub fn new(reader: Box<dyn PoolReaderInterface>) -> Self {
		Self { reader }
	}

	#[instrument(skip_all, fields(pool = %pool))]
	pub async fn read_immutables(&self, pool: Address) -> Result<PoolImmutables, PoolError> {
		let immutables = self.reader.read_immutables(pool).await?;
		debug!(
			token0 = %immutables.token0,
			token1 = %immutables.token1,
			fee = immutables.fee,
			"Read pool immutables"
		);
		Ok(immutables)
	}

	#[instrument(skip_all, fields(pool = %pool))]
	pub async fn read_state(&self, pool: Address) -> Result<PoolState, PoolError> {
		let state = self.reader.read_state(pool).await?;
		debug!(
			sqrt_price_x96 = %state.sqrt_price_x96,
			liquidity = state.liquidity,
			tick = state.tick,
			"Read pool state"
		);
		Ok(state)
	}

	pub async fn read_token(&self, token: Address) -> Result<TokenInfo, PoolError> {
		self.reader.read_token(token).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;
	use swapper_types::U160;

	struct FlakyReader {
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl PoolReaderInterface for FlakyReader {
		async fn read_immutables(&self, pool: Address) -> Result<PoolImmutables, PoolError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(PoolError::ChainRead {
				target: pool,
				call: "token0",
				reason: "connection reset".to_string(),
			})
		}

		async fn read_state(&self, _pool: Address) -> Result<PoolState, PoolError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(PoolState {
				sqrt_price_x96: U160::from(1u128 << 96),
				liquidity: 1_000_000,
				tick: -12,
			})
		}

		async fn read_token(&self, token: Address) -> Result<TokenInfo, PoolError> {
			Ok(TokenInfo {
				address: token,
				symbol: "USDC".to_string(),
				decimals: 6,
			})
		}
	}

	#[tokio::test]
	async fn test_read_errors_are_not_retried() {
		let calls = Arc::new(AtomicUsize::new(0));
		let service = PoolService::new(Box::new(FlakyReader {
			calls: calls.clone(),
		}));

		let pool = Address::repeat_byte(0x11);
		let err = service.read_immutables(pool).await.unwrap_err();
		assert!(err.to_string().contains("connection reset"));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_state_is_read_fresh_each_time() {
		let calls = Arc::new(AtomicUsize::new(0));
		let service = PoolService::new(Box::new(FlakyReader {
			calls: calls.clone(),
		}));

		let pool = Address::repeat_byte(0x11);
		let first = service.read_state(pool).await.unwrap();
		let second = service.read_state(pool).await.unwrap();
		assert_eq!(first, second);
		assert_eq!(first.tick, -12);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}
}
