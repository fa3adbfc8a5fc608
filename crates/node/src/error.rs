use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors surfaced by the dev ledger. Contract-level `require` failures all
/// come out as [`NodeError::Revert`], the way a real node reports them.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("sender {address} has insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { address: Address, needed: U256, available: U256 },

    #[error("no contract deployed at {0}")]
    UnknownContract(Address),

    #[error("contract at {address} is not a {expected}")]
    WrongArchetype { address: Address, expected: &'static str },
}

impl NodeError {
    pub(crate) fn revert(msg: impl Into<String>) -> Self {
        Self::Revert(msg.into())
    }
}
