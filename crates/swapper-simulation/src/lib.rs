//! Pre-flight checks for swap transactions.
//!
//! Simulation (`eth_call`) and gas estimation (`eth_estimateGas`) run against
//! the current chain head without mutating it. Both are advisory: their
//! failures are returned as typed values for the caller to act on, and neither
//! is required before submission.

use alloy::sol_types::{decode_revert_reason, Panic, Revert, SolError};
use async_trait::async_trait;
use swapper_types::{Bytes, Transaction};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub mod implementations {
	pub mod rpc;
}

/// How a node refused a read-only call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
	/// The node executed the call and it reverted (or was otherwise rejected).
	Reverted {
		/// Raw revert payload, when the node returned one.
		data: Option<Bytes>,
		/// Error message reported by the node.
		message: String,
	},
	/// The call never reached execution.
	Transport(String),
}

/// Trait defining the read-only execution surface used for pre-flight checks.
#[async_trait]
pub trait SimulationInterface: Send + Sync {
	/// Executes `tx` against the latest state and returns its output.
	async fn call(&self, tx: &Transaction) -> Result<Bytes, CallFailure>;

	/// Estimates the gas `tx` would consume.
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, CallFailure>;
}

/// Errors reported by pre-flight checks. None of them is fatal by itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulationError {
	/// The simulated call reverted.
	#[error("Simulation reverted: {}", reason.as_deref().unwrap_or(message))]
	Reverted {
		/// Decoded revert reason, when the payload could be decoded.
		reason: Option<String>,
		data: Option<Bytes>,
		message: String,
	},
	/// Gas estimation failed.
	#[error("Gas estimation failed: {}", reason.as_deref().unwrap_or(message))]
	GasEstimate {
		reason: Option<String>,
		message: String,
	},
	/// The node could not be reached.
	#[error("Simulation unavailable: {0}")]
	Unavailable(String),
}

impl SimulationError {
	/// Decoded revert reason, if any.
	pub fn reason(&self) -> Option<&str> {
		match self {
			SimulationError::Reverted { reason, .. } | SimulationError::GasEstimate { reason, .. } => {
				reason.as_deref()
			}
			SimulationError::Unavailable(_) => None,
		}
	}
}

/// Output of a successful simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
	/// Raw return data of the call.
	pub return_data: Bytes,
}

/// Gas estimate for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
	pub gas: u64,
}

impl GasEstimate {
	/// Estimate scaled by `percent` (e.g. 120 adds a 20% margin).
	pub fn with_margin(&self, percent: u64) -> u64 {
		self.gas.saturating_mul(percent) / 100
	}
}

/// Combined result of running both pre-flight checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
	pub simulation: Result<SimulationResult, SimulationError>,
	pub gas: Result<GasEstimate, SimulationError>,
}

impl PreflightReport {
	/// True if the simulation predicted a revert.
	pub fn reverted(&self) -> bool {
		matches!(self.simulation, Err(SimulationError::Reverted { .. }))
	}

	/// True if both checks succeeded.
	pub fn is_clean(&self) -> bool {
		self.simulation.is_ok() && self.gas.is_ok()
	}
}

/// Decodes `Error(string)`, `Panic(uint256)` or a bare utf8 payload.
fn decode_reason(data: &Option<Bytes>) -> Option<String> {
	let data = data.as_ref()?;
	if let Ok(revert) = Revert::abi_decode(data) {
		return Some(revert.reason);
	}
	if let Ok(panic) = Panic::abi_decode(data) {
		return Some(format!("panic code {}", panic.code));
	}
	decode_revert_reason(data)
}

/// Runs pre-flight checks through a simulation backend.
pub struct SimulationService {
	backend: Box<dyn SimulationInterface>,
}

impl SimulationService {
	pub fn new(backend: Box<dyn SimulationInterface>) -> Self {
		Self { backend }
	}

	/// Simulates `tx` and predicts its return value or revert.
	pub async fn simulate(&self, tx: &Transaction) -> Result<SimulationResult, SimulationError> {
		match self.backend.call(tx).await {
			Ok(return_data) => Ok(SimulationResult { return_data }),
			Err(CallFailure::Reverted { data, message }) => {
				let reason = decode_reason(&data);
				warn!(reason = ?reason, %message, "Simulation reverted");
				Err(SimulationError::Reverted {
					reason,
					data,
					message,
				})
			}
			Err(CallFailure::Transport(message)) => {
				warn!(%message, "Simulation unavailable");
				Err(SimulationError::Unavailable(message))
			}
		}
	}

	/// Estimates the gas `tx` would consume.
	pub async fn estimate_gas(&self, tx: &Transaction) -> Result<GasEstimate, SimulationError> {
		match self.backend.estimate_gas(tx).await {
			Ok(gas) => Ok(GasEstimate { gas }),
			Err(CallFailure::Reverted { data, message }) => {
				let reason = decode_reason(&data);
				warn!(reason = ?reason, %message, "Gas estimation failed");
				Err(SimulationError::GasEstimate { reason, message })
			}
			Err(CallFailure::Transport(message)) => {
				warn!(%message, "Gas estimation unavailable");
				Err(SimulationError::Unavailable(message))
			}
		}
	}

	/// Runs simulation and gas estimation concurrently.
	///
	/// Both checks always complete; one failing does not cut the other short.
	#[instrument(skip_all, fields(to = %tx.to))]
	pub async fn preflight(&self, tx: &Transaction) -> PreflightReport {
		let (simulation, gas) = tokio::join!(self.simulate(tx), self.estimate_gas(tx));

		info!(
			simulation_ok = simulation.is_ok(),
			gas = gas.as_ref().map(|g| g.gas).unwrap_or_default(),
			"Pre-flight checks finished"
		);

		PreflightReport { simulation, gas }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use swapper_types::{Address, U256};

	struct ScriptedBackend {
		call: Result<Bytes, CallFailure>,
		gas: Result<u64, CallFailure>,
	}

	#[async_trait]
	impl SimulationInterface for ScriptedBackend {
		async fn call(&self, _tx: &Transaction) -> Result<Bytes, CallFailure> {
			self.call.clone()
		}

		async fn estimate_gas(&self, _tx: &Transaction) -> Result<u64, CallFailure> {
			self.gas.clone()
		}
	}

	fn tx() -> Transaction {
		Transaction {
			to: Address::repeat_byte(0xe5),
			from: Address::repeat_byte(0xf3),
			data: Bytes::from(vec![0xac, 0x96, 0x50, 0xd8]),
			value: U256::ZERO,
			chain_id: 1,
			nonce: None,
			gas_limit: None,
			gas_price: None,
		}
	}

	fn stf_revert() -> CallFailure {
		let payload = Revert {
			reason: "STF".to_string(),
		}
		.abi_encode();
		CallFailure::Reverted {
			data: Some(payload.into()),
			message: "execution reverted: STF".to_string(),
		}
	}

	#[tokio::test]
	async fn test_revert_reason_is_decoded() {
		let service = SimulationService::new(Box::new(ScriptedBackend {
			call: Err(stf_revert()),
			gas: Ok(150_000),
		}));

		let err = service.simulate(&tx()).await.unwrap_err();
		assert_eq!(err.reason(), Some("STF"));
		assert!(err.to_string().contains("STF"));
	}

	#[tokio::test]
	async fn test_failures_do_not_block_each_other() {
		let service = SimulationService::new(Box::new(ScriptedBackend {
			call: Err(stf_revert()),
			gas: Ok(150_000),
		}));

		let report = service.preflight(&tx()).await;
		assert!(report.reverted());
		assert!(!report.is_clean());
		assert_eq!(report.gas, Ok(GasEstimate { gas: 150_000 }));

		let service = SimulationService::new(Box::new(ScriptedBackend {
			call: Ok(Bytes::from(vec![0u8; 32])),
			gas: Err(stf_revert()),
		}));

		let report = service.preflight(&tx()).await;
		assert!(!report.reverted());
		assert!(report.simulation.is_ok());
		assert!(matches!(
			report.gas,
			Err(SimulationError::GasEstimate { ref reason, .. }) if reason.as_deref() == Some("STF")
		));
	}

	#[tokio::test]
	async fn test_transport_failure_is_not_a_revert() {
		let service = SimulationService::new(Box::new(ScriptedBackend {
			call: Err(CallFailure::Transport("connection refused".to_string())),
			gas: Err(CallFailure::Transport("connection refused".to_string())),
		}));

		let report = service.preflight(&tx()).await;
		assert!(!report.reverted());
		assert!(matches!(report.simulation, Err(SimulationError::Unavailable(_))));
	}

	#[test]
	fn test_gas_margin() {
		assert_eq!(GasEstimate { gas: 100_000 }.with_margin(120), 120_000);
		assert_eq!(GasEstimate { gas: u64::MAX }.with_margin(120), u64::MAX / 100);
	}

	#[test]
	fn test_panic_payload_is_decoded() {
		let data = Panic {
			code: U256::from(0x11u64),
		}
		.abi_encode();
		assert_eq!(
			decode_reason(&Some(data.into())).as_deref(),
			Some("panic code 17")
		);
	}

	#[test]
	fn test_undecodable_revert_keeps_message() {
		let err = SimulationError::Reverted {
			reason: decode_reason(&Some(Bytes::from(vec![0xff, 0xfe]))),
			data: None,
			message: "execution reverted".to_string(),
		};
		assert_eq!(err.reason(), None);
		assert_eq!(err.to_string(), "Simulation reverted: execution reverted");
	}
}
