use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use swapper_config::{ConfigLoader, SwapperConfig};
use swapper_core::{SwapEvent, SwapPipeline};
use swapper_pool::implementations::rpc::RpcPoolReader;
use swapper_pool::PoolService;
use swapper_types::{
	truncate_hash, Address, PoolImmutables, PoolState, SwapCallParams, SwapLeg, TokenInfo,
};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod legs;
mod pipeline;

#[derive(Parser)]
#[command(name = "swapper")]
#[command(about = "Uniswap V3 swap pipeline", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[arg(short, long, value_name = "FILE", default_value = "config/swapper.toml")]
	config: PathBuf,

	/// Log filter; overrides `[logging] level` and `SWAPPER_LOG_LEVEL`
	#[arg(long)]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Validate the configuration file
	Validate,
	/// Print a configured pool's parameters and current state
	Pool {
		/// Pool name from [contracts.pools]
		name: String,
	},
	/// Execute the configured swap legs as one transaction
	Run {
		/// Build and pre-flight only; nothing is signed or sent
		#[arg(long)]
		dry_run: bool,
	},
}

#[derive(Serialize)]
struct PoolReport {
	address: Address,
	immutables: PoolImmutables,
	state: PoolState,
	token0: TokenInfo,
	token1: TokenInfo,
}

#[derive(Serialize)]
struct RunReport {
	run_id: String,
	dry_run: bool,
	deadline: Option<String>,
	legs: Vec<SwapCallParams>,
	simulation: String,
	gas_limit: Option<u64>,
	tx_hash: Option<String>,
	block_number: Option<u64>,
	gas_used: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	setup_tracing(cli.log_level.as_deref().unwrap_or(&config.logging.level))?;
	info!("Loaded configuration from: {:?}", cli.config);

	match &cli.command {
		Commands::Validate => validate_config(&config),
		Commands::Pool { name } => show_pool(&config, name).await,
		Commands::Run { dry_run } => run_swaps(&config, *dry_run).await,
	}
}

fn validate_config(config: &SwapperConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Router: {}", config.contracts.router);
	for (symbol, token) in &config.contracts.tokens {
		info!("  Token: {} ({})", symbol, token.address);
	}
	for (name, pool) in &config.contracts.pools {
		info!("  Pool: {} ({})", name, pool.address);
	}
	for (index, leg) in config.swaps.iter().enumerate() {
		info!(
			"  Swap {}: {} {} -> {} via {}",
			index, leg.amount_in, leg.token_in, leg.token_out, leg.pool
		);
	}

	Ok(())
}

async fn show_pool(config: &SwapperConfig, name: &str) -> Result<()> {
	let address = config
		.contracts
		.pools
		.get(name)
		.with_context(|| format!("Unknown pool '{name}'"))?
		.address;

	let provider = pipeline::connect(config)?;
	let pools = PoolService::new(Box::new(RpcPoolReader::new(provider)));

	let (immutables, state) = tokio::try_join!(
		pools.read_immutables(address),
		pools.read_state(address)
	)?;
	let (token0, token1) = tokio::try_join!(
		pools.read_token(immutables.token0),
		pools.read_token(immutables.token1)
	)?;

	let report = PoolReport {
		address,
		immutables,
		state,
		token0,
		token1,
	};
	println!("{}", serde_json::to_string_pretty(&report)?);
	Ok(())
}

async fn run_swaps(config: &SwapperConfig, dry_run: bool) -> Result<()> {
	if config.swaps.is_empty() {
		bail!("No [[swaps]] configured");
	}

	let provider = pipeline::connect(config)?;
	let metadata = PoolService::new(Box::new(RpcPoolReader::new(provider.clone())));
	let swap_pipeline = pipeline::build_pipeline(config, provider).await?;

	let legs = legs::resolve_legs(
		&config.swaps,
		&config.contracts,
		&metadata,
		config.execution.deadline_window(),
	)
	.await?;

	let events = tokio::spawn(log_events(swap_pipeline.event_bus().subscribe()));

	let report = if dry_run {
		plan(&swap_pipeline, &legs).await
	} else {
		until_interrupted(execute(&swap_pipeline, &legs), signal::ctrl_c()).await
	};
	events.abort();

	println!("{}", serde_json::to_string_pretty(&report?)?);
	Ok(())
}

async fn plan(swap_pipeline: &SwapPipeline, legs: &[SwapLeg]) -> Result<RunReport> {
	let plan = swap_pipeline.plan(legs).await?;

	Ok(RunReport {
		run_id: plan.run_id.to_string(),
		dry_run: true,
		deadline: format_deadline(plan.swap.deadline()),
		simulation: match &plan.preflight.simulation {
			Ok(_) => "ok".to_string(),
			Err(e) => e.to_string(),
		},
		legs: plan.swap.params,
		gas_limit: Some(plan.gas_limit),
		tx_hash: None,
		block_number: None,
		gas_used: None,
	})
}

async fn execute(swap_pipeline: &SwapPipeline, legs: &[SwapLeg]) -> Result<RunReport> {
	let execution = swap_pipeline
		.execute(legs)
		.await
		.context("Swap failed")?;

	Ok(RunReport {
		run_id: execution.run_id.to_string(),
		dry_run: false,
		deadline: format_deadline(execution.swap.deadline()),
		simulation: match &execution.preflight.simulation {
			Ok(_) => "ok".to_string(),
			Err(e) => e.to_string(),
		},
		gas_limit: execution.swap.transaction.gas_limit,
		legs: execution.swap.params,
		tx_hash: Some(execution.hash.to_string()),
		block_number: Some(execution.receipt.block_number),
		gas_used: Some(execution.receipt.gas_used),
	})
}

/// Runs `work` to completion unless `interrupt` fires first.
///
/// Interruption drops `work` wherever it is, including mid-approval, and is
/// reported as an error.
async fn until_interrupted<T>(
	work: impl Future<Output = Result<T>>,
	interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<T> {
	tokio::select! {
		result = work => result,
		_ = interrupt => {
			warn!("Interrupted; a transaction already sent may still be mined");
			bail!("Interrupted before the swap finished")
		}
	}
}

fn format_deadline(deadline: u64) -> Option<String> {
	let seconds = i64::try_from(deadline).ok()?;
	chrono::DateTime::from_timestamp(seconds, 0).map(|d| d.to_rfc3339())
}

async fn log_events(mut receiver: broadcast::Receiver<SwapEvent>) {
	while let Ok(event) = receiver.recv().await {
		match event {
			SwapEvent::AllowanceEnsured {
				token,
				approved: true,
				..
			} => info!(%token, "Router allowance granted"),
			SwapEvent::Submitted { hash, .. } => {
				info!(tx_hash = %truncate_hash(&hash), "Swap broadcast")
			}
			SwapEvent::Finished { hash, status, .. } => {
				info!(tx_hash = %truncate_hash(&hash), %status, "Swap finished")
			}
			_ => {}
		}
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
