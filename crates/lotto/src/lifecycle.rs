//! Lifecycle orchestration: deploy, start, enter, end, and resolving the
//! winner. Every stage resolves its account fresh, submits one transaction
//! and waits for one confirmation before returning.

use std::{path::Path, time::Duration};

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, B256, Bytes, U256, hex};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolValue;
use eyre::{Context, Result, eyre};
use lotto_bindings::{ILottery, IVrfCoordinator, LotteryPhase};
use lotto_config::ConfigError;
use lotto_node::{Archetype, ContractCall, Deployment, DevTransaction};
use tokio::time::{Instant, sleep};

use crate::{
    Chain, Lotto, TxOutcome,
    accounts::WalletOpts,
    contracts::LogicalContract,
    journal::Deployments,
};

/// Handle to a deployed lottery instance. `deploy_lottery` returns one and
/// every later stage takes it explicitly; `latest_lottery` recovers the
/// handle when a run starts mid-lifecycle.
#[derive(Clone, Copy, Debug)]
pub struct Lottery {
    pub address: Address,
}

/// Extra wei sent on top of the entrance fee when entering, to be safe
/// against the feed moving between the read and the entry.
pub const ENTRY_CUSHION: u64 = 100_000_000;

/// How long winner resolution waits for the off-chain responder by default.
pub const DEFAULT_WINNER_TIMEOUT: Duration = Duration::from_secs(60);

/// Randomness injected when the harness plays the responder itself on a
/// dev network.
pub const DEV_RANDOMNESS: u64 = 777;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

enum LotteryTx {
    Start,
    Enter { value: U256 },
    End,
}

impl Lotto {
    /// Deploys a lottery wired to the resolved dependency contracts and the
    /// network's fee and keyhash, waits for one confirmation, and records
    /// the address for later runs on persistent networks.
    pub async fn deploy_lottery(&self, opts: &WalletOpts) -> Result<Lottery> {
        let account = self.resolve_account(opts)?;
        let price_feed = self.get_contract(LogicalContract::EthUsdPriceFeed, &account).await?;
        let vrf_coordinator = self.get_contract(LogicalContract::VrfCoordinator, &account).await?;
        let link_token = self.get_contract(LogicalContract::LinkToken, &account).await?;
        let profile = self.config.network(&self.network)?;
        let fee = profile.fee(&self.network)?;
        let keyhash = profile.keyhash(&self.network)?;

        let address = match self.chain() {
            Chain::Dev(node) => node
                .execute(DevTransaction::deploy(
                    account.address(),
                    Deployment::Lottery { price_feed, vrf_coordinator, link_token, fee, keyhash },
                ))?
                .contract_address
                .ok_or_else(|| eyre!("deployment returned no address"))?,
            chain @ Chain::Live { .. } => {
                let artifact = profile.lottery_artifact.clone().ok_or(ConfigError::MissingField {
                    network: self.network.clone(),
                    field: "lottery_artifact",
                })?;
                let code = load_deploy_code(&artifact)?;
                let args =
                    (price_feed, vrf_coordinator, link_token, fee, keyhash).abi_encode_params();
                let data: Bytes = [code.as_ref(), args.as_slice()].concat().into();
                let provider = chain.signing_provider(&account)?;
                let receipt = provider
                    .send_transaction(TransactionRequest::default().with_deploy_code(data))
                    .await?
                    .with_required_confirmations(1)
                    .get_receipt()
                    .await?;
                if profile.verify {
                    warn!(target: "lotto", "source verification requested but not performed");
                }
                receipt
                    .contract_address
                    .ok_or_else(|| eyre!("deployment receipt carries no contract address"))?
            }
        };
        if !self.kind.is_local_dev() {
            Deployments::default().record(&self.network, address)?;
        }
        info!(target: "lotto", %address, "lottery deployed");
        Ok(Lottery { address })
    }

    /// The most recently deployed lottery: the dev ledger's registry
    /// in-process, the deployments journal across runs elsewhere.
    pub fn latest_lottery(&self) -> Result<Option<Lottery>> {
        match self.chain() {
            Chain::Dev(node) => Ok(node
                .latest_deployment(Archetype::Lottery)
                .map(|address| Lottery { address })),
            Chain::Live { .. } => Ok(Deployments::default()
                .latest(&self.network)?
                .map(|address| Lottery { address })),
        }
    }

    /// Opens the lottery for entries.
    pub async fn start_lottery(&self, lottery: &Lottery, opts: &WalletOpts) -> Result<TxOutcome> {
        let account = self.resolve_account(opts)?;
        let outcome = self.submit(&account, lottery, LotteryTx::Start).await?;
        info!(target: "lotto", "lottery started");
        Ok(outcome)
    }

    /// Enters the lottery. Without an explicit value, pays the current
    /// entrance fee plus a small cushion.
    pub async fn enter_lottery(
        &self,
        lottery: &Lottery,
        opts: &WalletOpts,
        value: Option<U256>,
    ) -> Result<TxOutcome> {
        let account = self.resolve_account(opts)?;
        let value = match value {
            Some(value) => value,
            None => self.entrance_fee(lottery).await? + U256::from(ENTRY_CUSHION),
        };
        let outcome = self.submit(&account, lottery, LotteryTx::Enter { value }).await?;
        info!(target: "lotto", %value, "entered the lottery");
        Ok(outcome)
    }

    /// Funds the lottery with utility token, ends it, and returns the
    /// emitted randomness request id, if one was observed in the receipt.
    pub async fn end_lottery(&self, lottery: &Lottery, opts: &WalletOpts) -> Result<Option<B256>> {
        let account = self.resolve_account(opts)?;
        self.fund_with_link(lottery.address, Some(&account), None, None).await?;
        let outcome = self.submit(&account, lottery, LotteryTx::End).await?;
        let request_id = outcome.randomness_request_id();
        match request_id {
            Some(id) => {
                info!(target: "lotto", request_id = %id, "lottery ended, awaiting randomness")
            }
            None => warn!(target: "lotto", "lottery ended but no randomness request was observed"),
        }
        Ok(request_id)
    }

    /// Polls until the lottery leaves the calculating phase, then reports
    /// the winner; fails explicitly once `timeout` expires. This replaces
    /// sleeping a fixed interval and hoping the responder was fast enough.
    pub async fn await_winner(&self, lottery: &Lottery, timeout: Duration) -> Result<Address> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.lottery_phase(lottery).await? != LotteryPhase::Calculating {
                return self.recent_winner(lottery).await;
            }
            let now = Instant::now();
            if now >= deadline {
                eyre::bail!(
                    "timed out after {timeout:?} waiting for the randomness responder; \
                     the winner is still unresolved"
                );
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Drives the coordinator's callback entry point directly,
    /// impersonating the off-chain responder. Dev-network tests and
    /// `lotto run` use this; live networks have a real responder.
    pub async fn fulfill_randomness(
        &self,
        coordinator: Address,
        lottery: &Lottery,
        request_id: B256,
        randomness: U256,
        opts: &WalletOpts,
    ) -> Result<TxOutcome> {
        let account = self.resolve_account(opts)?;
        match self.chain() {
            Chain::Dev(node) => Ok(node
                .execute(DevTransaction::call(
                    account.address(),
                    coordinator,
                    ContractCall::CallBackWithRandomness {
                        request_id,
                        randomness,
                        consumer: lottery.address,
                    },
                ))?
                .into()),
            chain @ Chain::Live { .. } => {
                let provider = chain.signing_provider(&account)?;
                let receipt = IVrfCoordinator::new(coordinator, provider)
                    .callBackWithRandomness(request_id, randomness, lottery.address)
                    .send()
                    .await?
                    .with_required_confirmations(1)
                    .get_receipt()
                    .await?;
                Ok(receipt.into())
            }
        }
    }

    /// The whole flow in one call: deploy, start, enter, end, resolve the
    /// winner. On a dev network the harness plays the randomness responder
    /// itself, since nothing else will.
    pub async fn run_lifecycle(&self, opts: &WalletOpts, timeout: Duration) -> Result<Address> {
        let lottery = self.deploy_lottery(opts).await?;
        self.start_lottery(&lottery, opts).await?;
        self.enter_lottery(&lottery, opts, None).await?;
        let request_id = self.end_lottery(&lottery, opts).await?;
        if self.kind.is_local_dev() {
            let request_id =
                request_id.ok_or_else(|| eyre!("no randomness request id in the end receipt"))?;
            let account = self.resolve_account(opts)?;
            let coordinator = self.get_contract(LogicalContract::VrfCoordinator, &account).await?;
            self.fulfill_randomness(
                coordinator,
                &lottery,
                request_id,
                U256::from(DEV_RANDOMNESS),
                opts,
            )
            .await?;
        }
        let winner = self.await_winner(&lottery, timeout).await?;
        info!(target: "lotto", %winner, "winner selected");
        Ok(winner)
    }

    pub async fn entrance_fee(&self, lottery: &Lottery) -> Result<U256> {
        match self.chain() {
            Chain::Dev(node) => Ok(node.entrance_fee(lottery.address)?),
            chain @ Chain::Live { .. } => {
                let provider = chain.read_provider()?;
                Ok(ILottery::new(lottery.address, provider).getEntranceFee().call().await?)
            }
        }
    }

    pub async fn lottery_phase(&self, lottery: &Lottery) -> Result<LotteryPhase> {
        let raw = match self.chain() {
            Chain::Dev(node) => return Ok(node.lottery_phase(lottery.address)?),
            chain @ Chain::Live { .. } => {
                let provider = chain.read_provider()?;
                ILottery::new(lottery.address, provider).lottery_state().call().await?
            }
        };
        LotteryPhase::from_raw(raw).ok_or_else(|| eyre!("unknown lottery phase {raw}"))
    }

    pub async fn player(&self, lottery: &Lottery, index: u64) -> Result<Address> {
        match self.chain() {
            Chain::Dev(node) => node
                .players(lottery.address)?
                .get(index as usize)
                .copied()
                .ok_or_else(|| eyre!("no player at index {index}")),
            chain @ Chain::Live { .. } => {
                let provider = chain.read_provider()?;
                Ok(ILottery::new(lottery.address, provider).players(U256::from(index)).call().await?)
            }
        }
    }

    pub async fn recent_winner(&self, lottery: &Lottery) -> Result<Address> {
        match self.chain() {
            Chain::Dev(node) => Ok(node.recent_winner(lottery.address)?),
            chain @ Chain::Live { .. } => {
                let provider = chain.read_provider()?;
                Ok(ILottery::new(lottery.address, provider).recentWinner().call().await?)
            }
        }
    }

    /// Native balance held by the lottery contract.
    pub async fn pot_balance(&self, lottery: &Lottery) -> Result<U256> {
        match self.chain() {
            Chain::Dev(node) => Ok(node.balance(lottery.address)),
            chain @ Chain::Live { .. } => {
                let provider = chain.read_provider()?;
                Ok(provider.get_balance(lottery.address).await?)
            }
        }
    }

    async fn submit(
        &self,
        account: &PrivateKeySigner,
        lottery: &Lottery,
        tx: LotteryTx,
    ) -> Result<TxOutcome> {
        match self.chain() {
            Chain::Dev(node) => {
                let from = account.address();
                let tx = match tx {
                    LotteryTx::Start => {
                        DevTransaction::call(from, lottery.address, ContractCall::StartLottery)
                    }
                    LotteryTx::Enter { value } => DevTransaction::call_with_value(
                        from,
                        lottery.address,
                        value,
                        ContractCall::Enter,
                    ),
                    LotteryTx::End => {
                        DevTransaction::call(from, lottery.address, ContractCall::EndLottery)
                    }
                };
                Ok(node.execute(tx)?.into())
            }
            chain @ Chain::Live { .. } => {
                let provider = chain.signing_provider(account)?;
                let instance = ILottery::new(lottery.address, provider);
                let pending = match tx {
                    LotteryTx::Start => instance.startLottery().send().await?,
                    LotteryTx::Enter { value } => instance.enter().value(value).send().await?,
                    LotteryTx::End => instance.endLottery().send().await?,
                };
                Ok(pending.with_required_confirmations(1).get_receipt().await?.into())
            }
        }
    }
}

/// Reads deployment bytecode out of a forge-style artifact JSON
/// (`bytecode.object`).
fn load_deploy_code(path: &Path) -> Result<Bytes> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read artifact {}", path.display()))?;
    let artifact: serde_json::Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("artifact {} is not valid JSON", path.display()))?;
    let object = artifact
        .get("bytecode")
        .and_then(|bytecode| bytecode.get("object"))
        .and_then(|object| object.as_str())
        .ok_or_else(|| eyre!("artifact {} has no bytecode.object", path.display()))?;
    let code = hex::decode(object.trim_start_matches("0x"))
        .wrap_err_with(|| format!("artifact {} has invalid bytecode hex", path.display()))?;
    Ok(code.into())
}
