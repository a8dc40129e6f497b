//! JSON-RPC simulation backend built on an Alloy provider.

use crate::{CallFailure, SimulationInterface};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;
use swapper_types::{Bytes, Transaction};

/// JSON-RPC error code geth uses for `execution reverted`.
const EXECUTION_REVERTED: i64 = 3;

/// Separates executed-and-reverted calls from everything else.
///
/// Only an error response that carries revert data, uses the revert code or
/// says so in its message counts as a revert. Rate limits and other node
/// errors never executed the call and are reported as transport failures.
fn classify(error: TransportError) -> CallFailure {
	match error.as_error_resp() {
		Some(payload) => {
			let data = payload.as_revert_data();
			let reverted = data.is_some()
				|| payload.code == EXECUTION_REVERTED
				|| payload.message.to_lowercase().contains("revert");
			if reverted {
				CallFailure::Reverted {
					data,
					message: payload.message.to_string(),
				}
			} else {
				CallFailure::Transport(format!("{} (code {})", payload.message, payload.code))
			}
		}
		None => CallFailure::Transport(error.to_string()),
	}
}

/// Simulation backend issuing `eth_call` and `eth_estimateGas`.
pub struct RpcSimulation {
	provider: DynProvider,
}

impl RpcSimulation {
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}
}

#[async_trait]
impl SimulationInterface for RpcSimulation {
	async fn call(&self, tx: &Transaction) -> Result<Bytes, CallFailure> {
		let request: TransactionRequest = tx.clone().into();
		self.provider.call(request).await.map_err(classify)
	}

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, CallFailure> {
		let mut request: TransactionRequest = tx.clone().into();
		// A caller-supplied limit would cap the estimate.
		request.gas = None;
		self.provider.estimate_gas(request).await.map_err(classify)
	}
}
