//! Event bus for observing pipeline progress.
//!
//! Each pipeline stage publishes a `SwapEvent` when it finishes, so callers
//! can follow a run without the pipeline depending on how they report it.

use swapper_types::{Address, TransactionHash, TransactionStatus};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Progress notifications emitted by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapEvent {
	/// Parameters were built for every leg.
	ParamsBuilt { run_id: Uuid, legs: usize },
	/// An allowance check finished; `approved` is true if a transaction was needed.
	AllowanceEnsured {
		run_id: Uuid,
		token: Address,
		approved: bool,
	},
	/// Pre-flight checks finished.
	PreflightCompleted {
		run_id: Uuid,
		reverted: bool,
		reason: Option<String>,
	},
	/// The swap transaction was broadcast.
	Submitted { run_id: Uuid, hash: TransactionHash },
	/// The swap transaction reached a terminal state.
	Finished {
		run_id: Uuid,
		hash: TransactionHash,
		status: TransactionStatus,
	},
	/// The run stopped before reaching a terminal transaction state.
	Aborted { run_id: Uuid, reason: String },
}

/// Broadcast channel for `SwapEvent`s.
pub struct EventBus {
	sender: broadcast::Sender<SwapEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if nobody is subscribed, which the pipeline ignores.
	pub fn publish(&self, event: SwapEvent) -> Result<(), broadcast::error::SendError<SwapEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
