//! Common types for the swapper pipeline.
//!
//! This crate defines the data model shared by every stage of the swap pipeline:
//! pool snapshots, swap intents and call parameters, encoded calls, transactions
//! and receipts. It carries no behavior beyond validation helpers and conversions.

pub mod account;
pub mod delivery;
pub mod pool;
pub mod swap;
pub mod utils;

pub use account::*;
pub use delivery::*;
pub use pool::*;
pub use swap::*;
pub use utils::*;

pub use alloy::primitives::{aliases::U160, Address, Bytes, B256, U256};
