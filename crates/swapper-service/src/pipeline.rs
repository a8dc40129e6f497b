//! Wires the RPC-backed stage implementations into a `SwapPipeline`.

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use swapper_account::implementations::local::LocalWallet;
use swapper_account::AccountInterface;
use swapper_approval::implementations::rpc::RpcToken;
use swapper_approval::{ApprovalConfig, ApprovalManager, ApprovalPolicy};
use swapper_config::{ApprovalMode, SwapperConfig};
use swapper_core::{
	EventBus, PipelineConfig, PipelineServices, PreflightPolicy, SwapPipeline,
};
use swapper_delivery::implementations::rpc::RpcDelivery;
use swapper_delivery::{DeliveryConfig, DeliveryService};
use swapper_order::SwapEncoder;
use swapper_pool::implementations::rpc::RpcPoolReader;
use swapper_pool::PoolService;
use swapper_simulation::implementations::rpc::RpcSimulation;
use swapper_simulation::SimulationService;
use tracing::{info, warn};

/// HTTP provider for the configured RPC endpoint.
pub fn connect(config: &SwapperConfig) -> Result<DynProvider> {
	let url = config
		.network
		.rpc_url
		.parse()
		.context("Invalid RPC URL")?;
	Ok(ProviderBuilder::new().connect_http(url).erased())
}

/// Chain ID reported by the node, checked against the configured one.
pub async fn resolve_chain_id(config: &SwapperConfig, provider: &DynProvider) -> Result<u64> {
	let reported = provider
		.get_chain_id()
		.await
		.context("Failed to query chain ID")?;

	match config.network.chain_id {
		Some(expected) if expected != reported => {
			bail!("Node serves chain {reported} but configuration expects {expected}")
		}
		Some(_) => Ok(reported),
		None => {
			warn!(chain_id = reported, "No chain ID configured, using the node's");
			Ok(reported)
		}
	}
}

fn approval_policy(config: &SwapperConfig) -> ApprovalPolicy {
	match config.execution.approval_mode {
		ApprovalMode::Exact => ApprovalPolicy::Exact,
		ApprovalMode::Multiple => ApprovalPolicy::Multiple(config.execution.approval_multiple),
		ApprovalMode::Unlimited => ApprovalPolicy::Unlimited,
	}
}

/// Pipeline configuration derived from the `[execution]` section.
pub fn pipeline_config(config: &SwapperConfig, chain_id: u64) -> PipelineConfig {
	let execution = &config.execution;
	PipelineConfig {
		chain_id,
		default_gas_limit: execution.default_gas_limit,
		gas_limit_margin_percent: execution.gas_limit_margin_percent,
		gas_price: execution.gas_price_wei(),
		confirmation_timeout: execution.confirmation_timeout(),
		preflight_policy: if execution.abort_on_revert {
			PreflightPolicy::AbortOnRevert
		} else {
			PreflightPolicy::Proceed
		},
	}
}

/// Builds the full pipeline against `provider`.
pub async fn build_pipeline(config: &SwapperConfig, provider: DynProvider) -> Result<SwapPipeline> {
	let chain_id = resolve_chain_id(config, &provider).await?;

	let wallet = LocalWallet::new(&config.account.private_key).context("Failed to load wallet")?;
	let account: Arc<dyn AccountInterface> = Arc::new(wallet);
	let address = account.address().await?;

	let delivery = Arc::new(DeliveryService::new(
		Box::new(RpcDelivery::new(provider.clone())),
		DeliveryConfig {
			poll_interval: config.execution.poll_interval(),
		},
	));

	let approvals = ApprovalManager::new(
		Box::new(RpcToken::new(provider.clone())),
		delivery.clone(),
		ApprovalConfig {
			policy: approval_policy(config),
			gas_limit: config.execution.approval_gas_limit,
			gas_price: config.execution.gas_price_wei(),
			timeout: config.execution.confirmation_timeout(),
		},
	);

	info!(
		chain_id,
		%address,
		router = %config.contracts.router,
		"Swap pipeline ready"
	);

	Ok(SwapPipeline::new(
		PipelineServices {
			pools: PoolService::new(Box::new(RpcPoolReader::new(provider.clone()))),
			approvals,
			simulation: SimulationService::new(Box::new(RpcSimulation::new(provider))),
			delivery,
			account,
		},
		SwapEncoder::new(config.contracts.router),
		pipeline_config(config, chain_id),
		EventBus::new(100),
	))
}
