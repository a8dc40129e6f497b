//! JSON-RPC token reader built on an Alloy provider.

use crate::{ApprovalError, TokenInterface, IERC20};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use swapper_types::{Address, U256};

/// Reads ERC-20 allowances through `eth_call`.
pub struct RpcToken {
	provider: DynProvider,
}

impl RpcToken {
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}
}

#[async_trait]
impl TokenInterface for RpcToken {
	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ApprovalError> {
		IERC20::new(token, self.provider.clone())
			.allowance(owner, spender)
			.call()
			.await
			.map_err(|e| ApprovalError::ChainRead {
				token,
				reason: e.to_string(),
			})
	}
}
