//! JSON-RPC pool reader built on an Alloy provider.

use crate::{PoolError, PoolReaderInterface};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use swapper_types::{Address, PoolImmutables, PoolState, TokenInfo};

sol! {
	#[sol(rpc)]
	interface IUniswapV3Pool {
		function factory() external view returns (address);
		function token0() external view returns (address);
		function token1() external view returns (address);
		function fee() external view returns (uint24);
		function liquidity() external view returns (uint128);
		function slot0() external view returns (
			uint160 sqrtPriceX96,
			int24 tick,
			uint16 observationIndex,
			uint16 observationCardinality,
			uint16 observationCardinalityNext,
			uint8 feeProtocol,
			bool unlocked
		);
	}

	#[sol(rpc)]
	interface IERC20Metadata {
		function symbol() external view returns (string);
		function decimals() external view returns (uint8);
	}
}

fn read_error(target: Address, call: &'static str) -> impl FnOnce(alloy::contract::Error) -> PoolError {
	move |e| PoolError::ChainRead {
		target,
		call,
		reason: e.to_string(),
	}
}

/// Pool reader backed by an Alloy provider.
pub struct RpcPoolReader {
	provider: DynProvider,
}

impl RpcPoolReader {
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}
}

#[async_trait]
impl PoolReaderInterface for RpcPoolReader {
	async fn read_immutables(&self, pool: Address) -> Result<PoolImmutables, PoolError> {
		let contract = IUniswapV3Pool::new(pool, self.provider.clone());

		let factory = contract.factory();
		let token0 = contract.token0();
		let token1 = contract.token1();
		let fee = contract.fee();

		let (factory, token0, token1, fee) = tokio::try_join!(
			async { factory.call().await.map_err(read_error(pool, "factory")) },
			async { token0.call().await.map_err(read_error(pool, "token0")) },
			async { token1.call().await.map_err(read_error(pool, "token1")) },
			async { fee.call().await.map_err(read_error(pool, "fee")) },
		)?;

		Ok(PoolImmutables {
			token0,
			token1,
			fee: fee.to::<u32>(),
			factory,
		})
	}

	async fn read_state(&self, pool: Address) -> Result<PoolState, PoolError> {
		let contract = IUniswapV3Pool::new(pool, self.provider.clone());

		let liquidity = contract.liquidity();
		let slot0 = contract.slot0();

		let (liquidity, slot0) = tokio::try_join!(
			async { liquidity.call().await.map_err(read_error(pool, "liquidity")) },
			async { slot0.call().await.map_err(read_error(pool, "slot0")) },
		)?;

		Ok(PoolState {
			sqrt_price_x96: slot0.sqrtPriceX96,
			liquidity,
			tick: slot0.tick.as_i32(),
		})
	}

	async fn read_token(&self, token: Address) -> Result<TokenInfo, PoolError> {
		let contract = IERC20Metadata::new(token, self.provider.clone());

		let symbol = contract.symbol();
		let decimals = contract.decimals();

		let (symbol, decimals) = tokio::try_join!(
			async { symbol.call().await.map_err(read_error(token, "symbol")) },
			async { decimals.call().await.map_err(read_error(token, "decimals")) },
		)?;

		Ok(TokenInfo {
			address: token,
			symbol,
			decimals,
		})
	}
}
