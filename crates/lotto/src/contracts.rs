//! Logical-contract resolution: mocks on a dev ledger, configured
//! addresses everywhere else. Also home of the utility-token funding
//! helper, since every randomness request needs it first.

use std::str::FromStr;

use alloy_primitives::{Address, I256, U256};
use alloy_signer_local::PrivateKeySigner;
use eyre::Result;
use lotto_bindings::ILinkToken;
use lotto_config::ConfigError;
use lotto_node::{Archetype, ContractCall, Deployment, DevTransaction};

use crate::{Chain, Lotto, TxOutcome, accounts::WalletOpts};

/// Logical dependency names, as they appear in per-network config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalContract {
    EthUsdPriceFeed,
    VrfCoordinator,
    LinkToken,
}

impl LogicalContract {
    /// The fixed mapping from logical name to the mock archetype deployed
    /// on dev networks.
    pub fn archetype(self) -> Archetype {
        match self {
            Self::EthUsdPriceFeed => Archetype::PriceFeed,
            Self::VrfCoordinator => Archetype::VrfCoordinator,
            Self::LinkToken => Archetype::LinkToken,
        }
    }

    /// The config key naming this contract in a network profile.
    pub fn key(self) -> &'static str {
        match self {
            Self::EthUsdPriceFeed => "eth_usd_price_feed",
            Self::VrfCoordinator => "vrf_coordinator",
            Self::LinkToken => "link_token",
        }
    }
}

impl FromStr for LogicalContract {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eth_usd_price_feed" => Ok(Self::EthUsdPriceFeed),
            "vrf_coordinator" => Ok(Self::VrfCoordinator),
            "link_token" => Ok(Self::LinkToken),
            other => eyre::bail!("unknown logical contract `{other}`"),
        }
    }
}

/// Decimals of the mock price feed.
pub const MOCK_FEED_DECIMALS: u8 = 8;

/// Initial mock answer: 2,000 USD per ETH at 8 decimals.
pub const MOCK_FEED_ANSWER: i64 = 200_000_000_000;

/// Default top-up for randomness requests: 0.1 token.
pub const DEFAULT_LINK_FUNDING: u64 = 100_000_000_000_000_000;

impl Lotto {
    /// Resolves a logical dependency to a usable address.
    ///
    /// On a dev network this returns the most recently deployed mock of the
    /// matching archetype, deploying the whole mock bundle first if none
    /// exists yet. On forked and live networks it reads the address from
    /// the active network's profile; binding against the interface happens
    /// at the call site.
    pub async fn get_contract(
        &self,
        name: LogicalContract,
        from: &PrivateKeySigner,
    ) -> Result<Address> {
        match self.chain() {
            Chain::Dev(node) => {
                if node.deployments(name.archetype()).is_empty() {
                    self.deploy_mocks(from).await?;
                }
                node.latest_deployment(name.archetype())
                    .ok_or_else(|| eyre::eyre!("mock bundle did not produce a {}", name.key()))
            }
            Chain::Live { .. } => {
                let profile = self.config.network(&self.network)?;
                let address = match name {
                    LogicalContract::EthUsdPriceFeed => profile.eth_usd_price_feed,
                    LogicalContract::VrfCoordinator => profile.vrf_coordinator,
                    LogicalContract::LinkToken => profile.link_token,
                };
                Ok(address.ok_or(ConfigError::MissingField {
                    network: self.network.clone(),
                    field: name.key(),
                })?)
            }
        }
    }

    /// Deploys the fixed three-mock bundle. Mocks always come as a set: the
    /// coordinator is constructed against the token, and deploying them
    /// together keeps a fresh ledger's registry complete after the first
    /// resolution.
    pub async fn deploy_mocks(&self, from: &PrivateKeySigner) -> Result<()> {
        let Chain::Dev(node) = self.chain() else {
            eyre::bail!("mocks are only deployed on local dev networks");
        };
        let deployer = from.address();
        info!(target: "lotto", %deployer, "deploying mocks");
        node.execute(DevTransaction::deploy(
            deployer,
            Deployment::PriceFeed {
                decimals: MOCK_FEED_DECIMALS,
                initial_answer: I256::try_from(MOCK_FEED_ANSWER)?,
            },
        ))?;
        let link = node
            .execute(DevTransaction::deploy(deployer, Deployment::LinkToken))?
            .contract_address
            .ok_or_else(|| eyre::eyre!("token deployment returned no address"))?;
        node.execute(DevTransaction::deploy(
            deployer,
            Deployment::VrfCoordinator { link_token: link },
        ))?;
        info!(target: "lotto", "mocks deployed");
        Ok(())
    }

    /// Transfers utility token to `target` and waits for one confirmation.
    /// Account, token contract and amount all default through the resolvers
    /// when not supplied. A failed transfer propagates as-is; there is no
    /// retry.
    pub async fn fund_with_link(
        &self,
        target: Address,
        from: Option<&PrivateKeySigner>,
        link_token: Option<Address>,
        amount: Option<U256>,
    ) -> Result<TxOutcome> {
        let default_signer;
        let from = match from {
            Some(signer) => signer,
            None => {
                default_signer = self.resolve_account(&WalletOpts::default())?;
                &default_signer
            }
        };
        let link = match link_token {
            Some(address) => address,
            None => self.get_contract(LogicalContract::LinkToken, from).await?,
        };
        let amount = amount.unwrap_or(U256::from(DEFAULT_LINK_FUNDING));

        let outcome = match self.chain() {
            Chain::Dev(node) => node
                .execute(DevTransaction::call(
                    from.address(),
                    link,
                    ContractCall::Transfer { to: target, amount },
                ))?
                .into(),
            chain @ Chain::Live { .. } => {
                let provider = chain.signing_provider(from)?;
                let receipt = ILinkToken::new(link, provider)
                    .transfer(target, amount)
                    .send()
                    .await?
                    .with_required_confirmations(1)
                    .get_receipt()
                    .await?;
                TxOutcome::from(receipt)
            }
        };
        info!(target: "lotto", %target, %amount, "funded contract with utility token");
        Ok(outcome)
    }
}
