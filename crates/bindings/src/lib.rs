//! # lotto-bindings
//!
//! `sol!` interface declarations for the lottery contract and the three
//! dependency contracts it is constructed against. The same declarations
//! serve both sides of the harness: the RPC instances used against live
//! networks, and the log encoding emitted by the in-process dev ledger.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use alloy_primitives::{B256, Bytes, LogData};
use alloy_sol_types::{SolEvent, sol};

sol! {
    #[sol(rpc)]
    interface ILottery {
        function getEntranceFee() external view returns (uint256);
        function startLottery() external;
        function enter() external payable;
        function endLottery() external;
        function players(uint256 index) external view returns (address);
        function recentWinner() external view returns (address);
        function lottery_state() external view returns (uint8);

        event RequestedRandomness(bytes32 requestId);
    }

    #[sol(rpc)]
    interface IAggregatorV3 {
        function decimals() external view returns (uint8);
        function latestAnswer() external view returns (int256);
        function updateAnswer(int256 answer) external;
    }

    #[sol(rpc)]
    interface ILinkToken {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    #[sol(rpc)]
    interface IVrfCoordinator {
        function callBackWithRandomness(bytes32 requestId, uint256 randomness, address consumerContract) external;
    }
}

/// Lifecycle phase of the lottery contract, in declaration order of the
/// on-chain enum. A freshly constructed lottery is `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LotteryPhase {
    Open = 0,
    Closed = 1,
    Calculating = 2,
}

impl LotteryPhase {
    /// Maps the raw `uint8` returned by `lottery_state()`.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Open),
            1 => Some(Self::Closed),
            2 => Some(Self::Calculating),
            _ => None,
        }
    }
}

/// Encodes a `RequestedRandomness(bytes32)` log the way the deployed
/// contract emits it: the event signature as topic 0 and the request id
/// ABI-encoded in the data section.
pub fn requested_randomness_log(request_id: B256) -> LogData {
    LogData::new_unchecked(
        vec![ILottery::RequestedRandomness::SIGNATURE_HASH],
        Bytes::copy_from_slice(request_id.as_slice()),
    )
}

/// Extracts the request id from a `RequestedRandomness` log, if the log is
/// one. Works on logs from the dev ledger and on live receipts alike.
pub fn decode_requested_randomness(log: &LogData) -> Option<B256> {
    if log.topics().first() != Some(&ILottery::RequestedRandomness::SIGNATURE_HASH) {
        return None;
    }
    if log.data.len() != 32 {
        return None;
    }
    Some(B256::from_slice(&log.data))
}
