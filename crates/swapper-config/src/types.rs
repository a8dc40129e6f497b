//! Configuration types.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use swapper_types::{Address, ConfirmationTimeout};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SwapperConfig {
	pub network: NetworkConfig,
	pub account: AccountConfig,
	pub contracts: ContractsConfig,
	#[serde(default)]
	pub execution: ExecutionConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
	/// Swap legs executed together by `swapper run`.
	#[serde(default)]
	pub swaps: Vec<SwapLegConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
	/// HTTP JSON-RPC endpoint.
	pub rpc_url: String,
	/// Expected chain ID; queried from the node when unset.
	pub chain_id: Option<u64>,
}

#[derive(Clone, Deserialize)]
pub struct AccountConfig {
	/// Hex private key, usually `${SWAPPER_PRIVATE_KEY}`.
	pub private_key: String,
}

impl std::fmt::Debug for AccountConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AccountConfig")
			.field("private_key", &"<redacted>")
			.finish()
	}
}

/// Addresses of the contracts the pipeline talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
	/// Swap router receiving `exactInputSingle` / `multicall`.
	pub router: Address,
	/// Tokens by symbol.
	#[serde(default)]
	pub tokens: HashMap<String, TokenConfig>,
	/// Pools by name.
	#[serde(default)]
	pub pools: HashMap<String, PoolConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
	pub address: Address,
	/// Decimals; read from the token contract when unset.
	pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
	pub address: Address,
}

/// How much allowance to grant when approving the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
	Exact,
	Multiple,
	Unlimited,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
	/// Gas limit used when estimation fails.
	pub default_gas_limit: u64,
	/// Percentage applied to gas estimates (120 = +20%).
	pub gas_limit_margin_percent: u64,
	/// Fixed gas price in gwei; the node's price is used when unset.
	pub gas_price_gwei: Option<u64>,
	/// Deadline window, counted from when the swap is built.
	pub deadline_secs: u64,
	/// Wall-clock confirmation timeout.
	pub confirmation_timeout_secs: u64,
	/// Block-count confirmation timeout; takes precedence when set.
	pub confirmation_timeout_blocks: Option<u64>,
	/// Delay between receipt polls.
	pub poll_interval_ms: u64,
	pub approval_mode: ApprovalMode,
	/// Multiplier used with `approval_mode = "multiple"`.
	pub approval_multiple: u64,
	pub approval_gas_limit: u64,
	/// Do not submit when the simulation predicts a revert.
	pub abort_on_revert: bool,
}

impl Default for ExecutionConfig {
	fn default() -> Self {
		Self {
			default_gas_limit: 4_000_000,
			gas_limit_margin_percent: 120,
			gas_price_gwei: None,
			deadline_secs: 600,
			confirmation_timeout_secs: 300,
			confirmation_timeout_blocks: None,
			poll_interval_ms: 2_000,
			approval_mode: ApprovalMode::Exact,
			approval_multiple: 1_000,
			approval_gas_limit: 100_000,
			abort_on_revert: true,
		}
	}
}

impl ExecutionConfig {
	pub fn confirmation_timeout(&self) -> ConfirmationTimeout {
		match self.confirmation_timeout_blocks {
			Some(blocks) => ConfirmationTimeout::Blocks(blocks),
			None => ConfirmationTimeout::Duration(Duration::from_secs(self.confirmation_timeout_secs)),
		}
	}

	pub fn gas_price_wei(&self) -> Option<u128> {
		self.gas_price_gwei.map(|gwei| u128::from(gwei) * 1_000_000_000)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn deadline_window(&self) -> Duration {
		Duration::from_secs(self.deadline_secs)
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

/// A configured swap leg, in human units.
#[derive(Debug, Clone, Deserialize)]
pub struct SwapLegConfig {
	/// Pool name from `[contracts.pools]`.
	pub pool: String,
	/// Token symbols from `[contracts.tokens]`.
	pub token_in: String,
	pub token_out: String,
	/// Input amount in whole tokens, e.g. `"0.01"`.
	pub amount_in: String,
	/// Minimum output in whole tokens; zero when unset.
	pub min_amount_out: Option<String>,
	pub recipient: Option<Address>,
}
