use swapper_account::AccountError;
use swapper_approval::ApprovalError;
use swapper_delivery::DeliveryError;
use swapper_order::OrderError;
use swapper_pool::PoolError;
use swapper_simulation::PreflightReport;
use thiserror::Error;

/// Pipeline failures, tagged by the stage that produced them.
#[derive(Error, Debug)]
pub enum PipelineError {
	#[error("Pool read failed: {0}")]
	Read(#[from] PoolError),

	#[error("Invalid swap: {0}")]
	Build(#[from] OrderError),

	#[error("Encoding failed: {0}")]
	Encode(OrderError),

	#[error("Account error: {0}")]
	Account(#[from] AccountError),

	#[error("Approval failed: {0}")]
	Approval(#[from] ApprovalError),

	#[error("Aborted after pre-flight: {}", preflight_summary(.0))]
	PreflightAborted(Box<PreflightReport>),

	#[error("Deadline {deadline} passed before submission (now {now})")]
	DeadlineExpired { deadline: u64, now: u64 },

	#[error("Delivery failed: {0}")]
	Delivery(#[from] DeliveryError),
}

fn preflight_summary(report: &PreflightReport) -> String {
	match &report.simulation {
		Err(e) => e.to_string(),
		Ok(_) => "simulation succeeded".to_string(),
	}
}

impl PipelineError {
	/// True when a transaction was broadcast but its fate is unknown.
	pub fn is_outcome_unknown(&self) -> bool {
		match self {
			PipelineError::Delivery(e) => e.is_outcome_unknown(),
			PipelineError::Approval(e) => e.is_outcome_unknown(),
			_ => false,
		}
	}
}
