//! Configuration loading for the swapper.
//!
//! Configuration is read from a TOML file. `${VAR}` references are replaced
//! with environment variables before parsing, so secrets never need to live
//! in the file, and a few `SWAPPER_*` variables override individual settings.

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "SWAPPER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<SwapperConfig, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		if !Path::new(file_path).exists() {
			return Err(ConfigError::FileNotFound(file_path.clone()));
		}

		let content = tokio::fs::read_to_string(file_path).await?;
		let mut config = self.parse(&content)?;

		self.apply_env_overrides(&mut config);
		validate_config(&config)?;

		Ok(config)
	}

	/// Parses configuration text after substituting environment variables.
	pub fn parse(&self, content: &str) -> Result<SwapperConfig, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn apply_env_overrides(&self, config: &mut SwapperConfig) {
		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			debug!("Overriding RPC URL from environment");
			config.network.rpc_url = rpc_url;
		}

		if let Ok(key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			debug!("Overriding private key from environment");
			config.account.private_key = key;
		}

		if let Ok(level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.logging.level = level;
		}
	}
}

/// Replaces `${VAR_NAME}` patterns with the variable's value.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn validate_config(config: &SwapperConfig) -> Result<(), ConfigError> {
	let url = &config.network.rpc_url;
	if !(url.starts_with("http://") || url.starts_with("https://")) {
		return Err(ConfigError::ValidationError(
			"RPC URL must start with http:// or https://".to_string(),
		));
	}

	let key = &config.account.private_key;
	let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);
	if key_without_prefix.len() != 64 || hex::decode(key_without_prefix).is_err() {
		return Err(ConfigError::ValidationError(
			"Private key must be 64 hex characters (32 bytes)".to_string(),
		));
	}

	let execution = &config.execution;
	if execution.gas_limit_margin_percent < 100 {
		return Err(ConfigError::ValidationError(
			"gas_limit_margin_percent must be at least 100".to_string(),
		));
	}
	if execution.deadline_secs == 0 {
		return Err(ConfigError::ValidationError(
			"deadline_secs must be greater than zero".to_string(),
		));
	}
	if execution.default_gas_limit == 0 || execution.approval_gas_limit == 0 {
		return Err(ConfigError::ValidationError(
			"Gas limits must be greater than zero".to_string(),
		));
	}

	for (index, leg) in config.swaps.iter().enumerate() {
		if !config.contracts.pools.contains_key(&leg.pool) {
			return Err(ConfigError::ValidationError(format!(
				"Swap {} references unknown pool '{}'",
				index, leg.pool
			)));
		}
		for symbol in [&leg.token_in, &leg.token_out] {
			if !config.contracts.tokens.contains_key(symbol) {
				return Err(ConfigError::ValidationError(format!(
					"Swap {} references unknown token '{}'",
					index, symbol
				)));
			}
		}
		if leg.token_in == leg.token_out {
			return Err(ConfigError::ValidationError(format!(
				"Swap {} has identical input and output tokens",
				index
			)));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use swapper_types::ConfirmationTimeout;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn sample(private_key: &str) -> String {
		format!(
			r#"
[network]
rpc_url = "https://sepolia.example.org"
chain_id = 11155111

[account]
private_key = "{private_key}"

[contracts]
router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"

[contracts.tokens.USDC]
address = "0x07865c6E87B9F70255377e024ace6630C1Eaa37F"
decimals = 6

[contracts.tokens.WETH]
address = "0xB4FBF271143F4FBf7B91A5ded31805e42b2208d6"

[contracts.pools.usdc-weth]
address = "0x4D7C363DED4B3b4e1F954494d2Bc3955e49699cC"

[execution]
confirmation_timeout_blocks = 5
approval_mode = "multiple"

[[swaps]]
pool = "usdc-weth"
token_in = "USDC"
token_out = "WETH"
amount_in = "100"
"#
		)
	}

	#[tokio::test]
	async fn test_load_with_env_substitution() {
		env::set_var("SWAPPER_TEST_WALLET_KEY", KEY);

		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(sample("${SWAPPER_TEST_WALLET_KEY}").as_bytes())
			.unwrap();

		let config = ConfigLoader::new()
			.with_env_prefix("SWAPPER_TEST_UNSET_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();

		assert_eq!(config.account.private_key, KEY);
		assert_eq!(config.network.chain_id, Some(11155111));
		assert_eq!(config.contracts.tokens["USDC"].decimals, Some(6));
		assert_eq!(config.contracts.tokens["WETH"].decimals, None);
		assert_eq!(config.swaps.len(), 1);
		assert_eq!(config.execution.approval_mode, ApprovalMode::Multiple);
		assert_eq!(config.execution.default_gas_limit, 4_000_000);
		assert_eq!(
			config.execution.confirmation_timeout(),
			ConfirmationTimeout::Blocks(5)
		);
	}

	#[tokio::test]
	async fn test_log_level_override() {
		env::set_var("SWAPPER_TEST_LOGS_LOG_LEVEL", "swapper_core=debug");

		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(sample(KEY).as_bytes()).unwrap();

		let config = ConfigLoader::new()
			.with_env_prefix("SWAPPER_TEST_LOGS_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.logging.level, "swapper_core=debug");

		let defaults = ConfigLoader::new().parse(&sample(KEY)).unwrap();
		assert_eq!(defaults.logging.level, "info");
	}

	#[test]
	fn test_missing_env_var() {
		let err = ConfigLoader::new()
			.parse(&sample("${SWAPPER_TEST_DEFINITELY_MISSING}"))
			.unwrap_err();
		assert!(matches!(err, ConfigError::EnvVarNotFound(ref v) if v == "SWAPPER_TEST_DEFINITELY_MISSING"));
	}

	#[test]
	fn test_rejects_unknown_pool_reference() {
		let text = sample(KEY).replace("pool = \"usdc-weth\"", "pool = \"missing\"");
		let config = ConfigLoader::new().parse(&text).unwrap();
		assert!(matches!(
			validate_config(&config),
			Err(ConfigError::ValidationError(ref msg)) if msg.contains("missing")
		));
	}

	#[test]
	fn test_rejects_bad_private_key() {
		let config = ConfigLoader::new().parse(&sample("0x1234")).unwrap();
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_execution_defaults() {
		let execution = ExecutionConfig::default();
		assert_eq!(execution.gas_price_wei(), None);
		assert_eq!(
			execution.confirmation_timeout(),
			ConfirmationTimeout::Duration(std::time::Duration::from_secs(300))
		);
		assert!(execution.abort_on_revert);

		let priced = ExecutionConfig {
			gas_price_gwei: Some(30),
			..Default::default()
		};
		assert_eq!(priced.gas_price_wei(), Some(30_000_000_000));
	}

	#[tokio::test]
	async fn test_missing_file() {
		let err = ConfigLoader::new()
			.with_file("/nonexistent/swapper.toml")
			.load()
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::FileNotFound(_)));
	}
}
