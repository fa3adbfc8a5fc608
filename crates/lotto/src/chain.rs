//! The two ways the harness reaches a chain: the in-process dev ledger, or
//! an RPC provider built per-operation around the resolved signer.

use std::sync::Arc;

use alloy_consensus::TxReceipt;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256, LogData};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionReceipt;
use alloy_signer_local::PrivateKeySigner;
use eyre::Result;
use lotto_bindings::decode_requested_randomness;
use lotto_node::{DevNode, DevReceipt};
use url::Url;

pub enum Chain {
    Dev(Arc<DevNode>),
    Live { url: Url },
}

impl Chain {
    /// A provider that signs and sends as `signer`. Only meaningful against
    /// an RPC endpoint; the dev ledger takes transactions directly.
    pub fn signing_provider(&self, signer: &PrivateKeySigner) -> Result<DynProvider> {
        match self {
            Self::Dev(_) => {
                eyre::bail!("the dev ledger takes transactions directly, not over RPC")
            }
            Self::Live { url } => {
                let wallet = EthereumWallet::from(signer.clone());
                Ok(ProviderBuilder::new().wallet(wallet).connect_http(url.clone()).erased())
            }
        }
    }

    /// A provider for read-only calls.
    pub fn read_provider(&self) -> Result<DynProvider> {
        match self {
            Self::Dev(_) => {
                eyre::bail!("the dev ledger answers reads directly, not over RPC")
            }
            Self::Live { url } => Ok(ProviderBuilder::new().connect_http(url.clone()).erased()),
        }
    }
}

/// What the harness keeps from a confirmed transaction, whichever side it
/// ran on.
#[derive(Clone, Debug)]
pub struct TxOutcome {
    pub transaction_hash: B256,
    pub contract_address: Option<Address>,
    pub logs: Vec<(Address, LogData)>,
}

impl TxOutcome {
    /// The request id emitted by `endLottery`, if this transaction emitted
    /// one.
    pub fn randomness_request_id(&self) -> Option<B256> {
        self.logs.iter().find_map(|(_, data)| decode_requested_randomness(data))
    }
}

impl From<DevReceipt> for TxOutcome {
    fn from(receipt: DevReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            logs: receipt.logs.into_iter().map(|log| (log.address, log.data)).collect(),
        }
    }
}

impl From<TransactionReceipt> for TxOutcome {
    fn from(receipt: TransactionReceipt) -> Self {
        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(|log| (log.address(), log.data().clone()))
            .collect();
        Self {
            transaction_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            logs,
        }
    }
}
