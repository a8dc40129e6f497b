//! Small helpers shared across crates.

use alloy::primitives::B256;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Utility function to truncate a transaction hash for display.
pub fn truncate_hash(hash: &B256) -> String {
	let hash_str = hex::encode(hash.0);
	format!("{}..", &hash_str[..8])
}
