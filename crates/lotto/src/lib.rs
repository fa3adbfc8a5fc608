//! # lotto
//!
//! Deployment and lifecycle harness for the VRF lottery contract. The
//! harness connects to one network at a time: a local-dev network gets an
//! in-process dev ledger with mocked dependency contracts, everything else
//! goes through an RPC provider against the addresses in `lotto.toml`.

#[macro_use]
extern crate tracing;

use std::sync::Arc;

use eyre::Result;
use lotto_config::{Config, NetworkKind};
use lotto_node::{DevNode, NodeConfig};

pub mod accounts;
pub mod chain;
pub mod contracts;
pub mod journal;
pub mod lifecycle;

pub use chain::{Chain, TxOutcome};

// the crates downstream callers usually need alongside the harness
pub use lotto_bindings as bindings;
pub use lotto_config as config;
pub use lotto_node as node;

/// Harness entry point: the active network plus whatever it takes to reach
/// it. Accounts and contracts are re-resolved on every operation; the only
/// state held here is the dev ledger itself, when there is one.
pub struct Lotto {
    pub config: Config,
    /// Name of the active network.
    pub network: String,
    /// Category of the active network, derived from its name.
    pub kind: NetworkKind,
    chain: Chain,
}

impl Lotto {
    /// Connects to `network`, falling back to the config's default. On a
    /// local-dev network this spins up a fresh dev ledger with the ten dev
    /// accounts funded; otherwise the network's RPC endpoint must be
    /// configured.
    pub fn connect(config: Config, network: Option<String>) -> Result<Self> {
        let network = network.unwrap_or_else(|| config.default_network.clone());
        let kind = NetworkKind::classify(&network);
        let chain = match kind {
            NetworkKind::LocalDev => {
                let genesis = accounts::dev_addresses()?;
                let node = DevNode::new(NodeConfig::default().with_genesis_accounts(genesis));
                Chain::Dev(Arc::new(node))
            }
            NetworkKind::ForkedLocal | NetworkKind::Live => {
                let url = config.network(&network)?.rpc_url(&network)?;
                Chain::Live { url }
            }
        };
        info!(target: "lotto", %network, ?kind, "connected");
        Ok(Self { config, network, kind, chain })
    }

    /// The in-process dev ledger, when connected to a local-dev network.
    pub fn dev_node(&self) -> Option<&Arc<DevNode>> {
        match &self.chain {
            Chain::Dev(node) => Some(node),
            Chain::Live { .. } => None,
        }
    }

    pub(crate) fn chain(&self) -> &Chain {
        &self.chain
    }
}
