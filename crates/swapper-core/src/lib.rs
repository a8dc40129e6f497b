//! Swap pipeline orchestration.
//!
//! `SwapPipeline` runs the stages of a swap in a fixed order: read pool state,
//! build parameters, ensure allowances, encode, pre-flight and finally submit
//! and confirm. Each stage reports failures through its own `PipelineError`
//! variant, and everything that can be validated without the chain is
//! validated before the first read.

use std::collections::BTreeMap;
use std::sync::Arc;
use swapper_account::AccountInterface;
use swapper_approval::{ApprovalManager, ApprovalOutcome};
use swapper_delivery::DeliveryService;
use swapper_order::{batch, OrderError, SwapEncoder, SwapParamBuilder};
use swapper_pool::PoolService;
use swapper_simulation::{PreflightReport, SimulationService};
use swapper_types::{
	current_timestamp, truncate_hash, Address, ConfirmationTimeout, EncodedCall, SwapCallParams,
	SwapLeg, Transaction, TransactionHash, TransactionReceipt, TransactionStatus, U256,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub mod error;
pub mod event_bus;

pub use error::PipelineError;
pub use event_bus::{EventBus, SwapEvent};

/// What to do when the simulation predicts a revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightPolicy {
	/// Stop before submitting.
	AbortOnRevert,
	/// Submit anyway; the report is still returned.
	Proceed,
}

/// Settings for the swap transaction itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
	pub chain_id: u64,
	/// Gas limit used when estimation fails.
	pub default_gas_limit: u64,
	/// Percentage applied to the gas estimate (120 = +20%).
	pub gas_limit_margin_percent: u64,
	/// Fixed gas price; the node's price is used when unset.
	pub gas_price: Option<u128>,
	pub confirmation_timeout: ConfirmationTimeout,
	pub preflight_policy: PreflightPolicy,
}

/// A swap that has been built and encoded but not broadcast.
#[derive(Debug, Clone)]
pub struct PreparedSwap {
	/// Router parameters, one per leg, in execution order.
	pub params: Vec<SwapCallParams>,
	/// Encoded `exactInputSingle` calls, one per leg.
	pub calls: Vec<EncodedCall>,
	/// Unsigned transaction carrying the single call or the `multicall` batch.
	pub transaction: Transaction,
}

impl PreparedSwap {
	/// Earliest deadline across all legs.
	pub fn deadline(&self) -> u64 {
		self.params
			.iter()
			.map(|p| p.deadline)
			.min()
			.unwrap_or_default()
	}

	/// Input amounts summed per token, ordered by token address.
	pub fn required_allowances(&self) -> Vec<(Address, U256)> {
		required_allowances(&self.params)
	}
}

/// Recomputes each leg's deadline for a swap encoded at `now`.
fn refresh_deadlines(params: &mut [SwapCallParams], legs: &[SwapLeg], now: u64) {
	for (leg_params, leg) in params.iter_mut().zip(legs) {
		leg_params.deadline = leg.intent.deadline_at(now);
	}
}

fn required_allowances(params: &[SwapCallParams]) -> Vec<(Address, U256)> {
	let mut totals: BTreeMap<Address, U256> = BTreeMap::new();
	for leg in params {
		let total = totals.entry(leg.token_in).or_default();
		*total = total.saturating_add(leg.amount_in);
	}
	totals.into_iter().collect()
}

/// Result of a dry run.
#[derive(Debug, Clone)]
pub struct SwapPlan {
	pub run_id: Uuid,
	pub swap: PreparedSwap,
	pub preflight: PreflightReport,
	/// Gas limit the swap would be submitted with.
	pub gas_limit: u64,
}

/// Result of a confirmed swap.
#[derive(Debug, Clone)]
pub struct SwapExecution {
	pub run_id: Uuid,
	pub swap: PreparedSwap,
	/// Allowance checks, one per input token.
	pub approvals: Vec<(Address, ApprovalOutcome)>,
	pub preflight: PreflightReport,
	pub hash: TransactionHash,
	pub receipt: TransactionReceipt,
}

/// The stage services a pipeline is assembled from.
pub struct PipelineServices {
	pub pools: PoolService,
	pub approvals: ApprovalManager,
	pub simulation: SimulationService,
	pub delivery: Arc<DeliveryService>,
	pub account: Arc<dyn AccountInterface>,
}

/// Composes the swap stages into a single flow.
pub struct SwapPipeline {
	pools: PoolService,
	builder: SwapParamBuilder,
	encoder: SwapEncoder,
	approvals: ApprovalManager,
	simulation: SimulationService,
	delivery: Arc<DeliveryService>,
	account: Arc<dyn AccountInterface>,
	config: PipelineConfig,
	event_bus: EventBus,
}

impl SwapPipeline {
	pub fn new(
		services: PipelineServices,
		encoder: SwapEncoder,
		config: PipelineConfig,
		event_bus: EventBus,
	) -> Self {
		Self {
			pools: services.pools,
			builder: SwapParamBuilder::new(),
			encoder,
			approvals: services.approvals,
			simulation: services.simulation,
			delivery: services.delivery,
			account: services.account,
			config,
			event_bus,
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Router every swap is sent to and every allowance is granted to.
	pub fn router(&self) -> Address {
		self.encoder.router()
	}

	/// Reads pools and builds router parameters for every leg.
	///
	/// Intents are checked before any pool is read, so an invalid leg never
	/// causes chain traffic. Pool state is read fresh for each leg.
	pub async fn build(
		&self,
		legs: &[SwapLeg],
		caller: Address,
	) -> Result<Vec<SwapCallParams>, PipelineError> {
		if legs.is_empty() {
			return Err(PipelineError::Encode(OrderError::EmptyBatch));
		}

		let now = current_timestamp();
		for leg in legs {
			self.builder.check_intent_at(&leg.intent, now)?;
		}

		let mut params = Vec::with_capacity(legs.len());
		for (index, leg) in legs.iter().enumerate() {
			let (immutables, state) = tokio::try_join!(
				self.pools.read_immutables(leg.pool),
				self.pools.read_state(leg.pool)
			)?;

			let leg_params = self
				.builder
				.build_params(&leg.intent, caller, &immutables, &state)?;
			info!(
				leg = index,
				pool = %leg.pool,
				fee = leg_params.fee,
				amount_in = %leg_params.amount_in,
				"Built swap leg"
			);
			params.push(leg_params);
		}

		Ok(params)
	}

	/// Encodes built parameters into one unsigned transaction.
	///
	/// A single leg is sent as a plain `exactInputSingle`; several legs are
	/// packed into one `multicall` so they succeed or revert together.
	pub fn encode(
		&self,
		params: Vec<SwapCallParams>,
		caller: Address,
	) -> Result<PreparedSwap, PipelineError> {
		let calls: Vec<EncodedCall> = params.iter().map(|p| self.encoder.encode(p)).collect();

		let call = match calls.as_slice() {
			[single] => single.clone(),
			_ => batch(&calls).map_err(PipelineError::Encode)?.into(),
		};

		let mut transaction = Transaction::from_call(call, caller, self.config.chain_id);
		if let Some(gas_price) = self.config.gas_price {
			transaction = transaction.with_gas_price(gas_price);
		}

		Ok(PreparedSwap {
			params,
			calls,
			transaction,
		})
	}

	/// Builds, encodes and pre-flights `legs` without sending anything.
	///
	/// No approvals are submitted, so a missing allowance shows up as a
	/// simulated revert.
	#[instrument(skip_all, fields(legs = legs.len()))]
	pub async fn plan(&self, legs: &[SwapLeg]) -> Result<SwapPlan, PipelineError> {
		let run_id = Uuid::new_v4();
		let caller = self.account.address().await?;

		let params = self.build(legs, caller).await?;
		self.publish(SwapEvent::ParamsBuilt {
			run_id,
			legs: params.len(),
		});

		let swap = self.encode(params, caller)?;
		let preflight = self.preflight(run_id, &swap.transaction).await;
		let gas_limit = self.gas_limit(&preflight);

		Ok(SwapPlan {
			run_id,
			swap,
			preflight,
			gas_limit,
		})
	}

	/// Runs the full pipeline and waits for the swap to confirm.
	///
	/// Stages run strictly in order. Approvals are confirmed before the swap is
	/// encoded and simulated, and the swap is broadcast at most once.
	#[instrument(skip_all, fields(legs = legs.len()))]
	pub async fn execute(&self, legs: &[SwapLeg]) -> Result<SwapExecution, PipelineError> {
		let run_id = Uuid::new_v4();
		let result = self.run(run_id, legs).await;
		if let Err(e) = &result {
			error!(%run_id, error = %e, "Swap pipeline failed");
			if !self.swap_finished(e).await {
				self.publish(SwapEvent::Aborted {
					run_id,
					reason: e.to_string(),
				});
			}
		}
		result
	}

	/// Whether the swap itself reached a terminal state before `error`.
	async fn swap_finished(&self, error: &PipelineError) -> bool {
		let PipelineError::Delivery(e) = error else {
			return false;
		};
		match e.transaction_hash() {
			Some(hash) => self
				.delivery
				.status(&hash)
				.await
				.is_some_and(|status| status.is_terminal()),
			None => false,
		}
	}

	async fn run(&self, run_id: Uuid, legs: &[SwapLeg]) -> Result<SwapExecution, PipelineError> {
		let caller = self.account.address().await?;
		info!(%run_id, %caller, "Starting swap pipeline");

		let mut params = self.build(legs, caller).await?;
		self.publish(SwapEvent::ParamsBuilt {
			run_id,
			legs: params.len(),
		});

		let approvals = self.ensure_allowances(run_id, &params, caller).await?;

		// Relative deadlines start counting once approvals are done.
		refresh_deadlines(&mut params, legs, current_timestamp());

		let mut swap = self.encode(params, caller)?;

		let preflight = self.preflight(run_id, &swap.transaction).await;
		if preflight.reverted() && self.config.preflight_policy == PreflightPolicy::AbortOnRevert {
			return Err(PipelineError::PreflightAborted(Box::new(preflight)));
		}
		swap.transaction.gas_limit = Some(self.gas_limit(&preflight));

		// Absolute deadlines may have passed while approvals confirmed.
		let deadline = swap.deadline();
		let now = current_timestamp();
		if deadline <= now {
			return Err(PipelineError::DeadlineExpired { deadline, now });
		}

		let pending = self
			.delivery
			.submit(swap.transaction.clone(), self.account.as_ref())
			.await?;
		self.publish(SwapEvent::Submitted {
			run_id,
			hash: pending.hash,
		});

		match self
			.delivery
			.confirm(&pending, self.config.confirmation_timeout)
			.await
		{
			Ok(receipt) => {
				info!(
					%run_id,
					tx_hash = %truncate_hash(&receipt.hash),
					block = receipt.block_number,
					gas_used = receipt.gas_used,
					"Swap confirmed"
				);
				self.finish(run_id, pending.hash, TransactionStatus::Confirmed);
				Ok(SwapExecution {
					run_id,
					swap,
					approvals,
					preflight,
					hash: pending.hash,
					receipt,
				})
			}
			Err(e) => {
				let status = self
					.delivery
					.status(&pending.hash)
					.await
					.filter(TransactionStatus::is_terminal);
				if let Some(status) = status {
					self.finish(run_id, pending.hash, status);
				}
				Err(e.into())
			}
		}
	}

	/// Makes sure the router may pull every leg's input, one token at a time.
	async fn ensure_allowances(
		&self,
		run_id: Uuid,
		params: &[SwapCallParams],
		owner: Address,
	) -> Result<Vec<(Address, ApprovalOutcome)>, PipelineError> {
		let required = required_allowances(params);
		let mut outcomes = Vec::with_capacity(required.len());
		for (token, amount) in required {
			let outcome = self
				.approvals
				.ensure_allowance(token, owner, self.router(), amount, self.account.as_ref())
				.await?;
			self.publish(SwapEvent::AllowanceEnsured {
				run_id,
				token,
				approved: matches!(outcome, ApprovalOutcome::Approved(_)),
			});
			outcomes.push((token, outcome));
		}

		Ok(outcomes)
	}

	async fn preflight(&self, run_id: Uuid, tx: &Transaction) -> PreflightReport {
		let report = self.simulation.preflight(tx).await;
		let reason = report
			.simulation
			.as_ref()
			.err()
			.map(|e| e.reason().map(str::to_string).unwrap_or_else(|| e.to_string()));
		if report.reverted() {
			warn!(%run_id, reason = ?reason, "Simulation predicts a revert");
		}
		self.publish(SwapEvent::PreflightCompleted {
			run_id,
			reverted: report.reverted(),
			reason,
		});
		report
	}

	/// Estimate plus margin, or the configured default when estimation failed.
	fn gas_limit(&self, report: &PreflightReport) -> u64 {
		match &report.gas {
			Ok(estimate) => estimate.with_margin(self.config.gas_limit_margin_percent),
			Err(e) => {
				warn!(
					error = %e,
					gas_limit = self.config.default_gas_limit,
					"Using default gas limit"
				);
				self.config.default_gas_limit
			}
		}
	}

	fn finish(&self, run_id: Uuid, hash: TransactionHash, status: TransactionStatus) {
		self.publish(SwapEvent::Finished {
			run_id,
			hash,
			status,
		});
	}

	fn publish(&self, event: SwapEvent) {
		self.event_bus.publish(event).ok();
	}
}
