//! # lotto-node
//!
//! An in-process development ledger standing in for a disposable local
//! chain. It holds funded genesis accounts, executes transactions
//! sequentially and transactionally (failed transactions leave no trace),
//! keeps a per-archetype registry of deployments in creation order, and
//! runs native implementations of the lottery and its three dependency
//! mocks. Senders are trusted as-is, like a dev node with
//! auto-impersonation enabled.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use alloy_primitives::{Address, I256, U256, keccak256};
use lotto_bindings::LotteryPhase;
use parking_lot::Mutex;
use tracing::{debug, info};

mod contracts;
pub use contracts::Archetype;
use contracts::{
    CallEnv, ContractState, LinkTokenState, LotteryState, PriceFeedState, VrfCoordinatorState,
    dispatch, exp10,
};

mod error;
pub use error::NodeError;

mod state;
use state::NodeState;

mod transaction;
pub use transaction::{ContractCall, Deployment, DevReceipt, DevTransaction, LogRecord, TxAction};

/// Genesis configuration for a [`DevNode`].
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub genesis_accounts: Vec<Address>,
    /// Balance given to every genesis account, 10,000 ether by default.
    pub genesis_balance: U256,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { genesis_accounts: Vec::new(), genesis_balance: U256::from(10_000) * exp10(18) }
    }
}

impl NodeConfig {
    pub fn with_genesis_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.genesis_accounts = accounts;
        self
    }

    pub fn with_genesis_balance(mut self, balance: U256) -> Self {
        self.genesis_balance = balance;
        self
    }
}

/// The dev ledger. Cheap to create, safe to share behind an `Arc`.
pub struct DevNode {
    state: Mutex<NodeState>,
}

impl DevNode {
    pub fn new(config: NodeConfig) -> Self {
        info!(
            target: "node",
            accounts = config.genesis_accounts.len(),
            balance = %config.genesis_balance,
            "dev ledger ready"
        );
        Self { state: Mutex::new(NodeState::new(&config.genesis_accounts, config.genesis_balance)) }
    }

    /// Executes one transaction. State changes are committed only when the
    /// whole transaction succeeds; any error rolls everything back,
    /// including the value transfer.
    pub fn execute(&self, tx: DevTransaction) -> Result<DevReceipt, NodeError> {
        let mut committed = self.state.lock();
        let mut pending = committed.clone();

        let nonce = pending.nonce(tx.from);
        let mut buf = [0u8; 36];
        buf[..20].copy_from_slice(tx.from.as_slice());
        buf[20..28].copy_from_slice(&nonce.to_be_bytes());
        buf[28..].copy_from_slice(&pending.height.to_be_bytes());
        let transaction_hash = keccak256(buf);

        let (contract_address, logs) = match tx.action {
            TxAction::Deploy(deployment) => {
                let address = pending.create_address(tx.from);
                let contract = instantiate(&pending, tx.from, deployment)?;
                let archetype = contract.archetype();
                pending.transfer(tx.from, address, tx.value)?;
                pending.insert_contract(address, contract);
                debug!(target: "node", %address, archetype = archetype.name(), "contract deployed");
                (Some(address), Vec::new())
            }
            TxAction::Call { to, call } => {
                pending.transfer(tx.from, to, tx.value)?;
                let env = CallEnv { caller: tx.from, contract: to, value: tx.value };
                let logs = dispatch(&mut pending, &env, call)?;
                (None, logs)
            }
        };

        pending.bump_nonce(tx.from);
        pending.height += 1;
        let block_number = pending.height;
        *committed = pending;

        Ok(DevReceipt { transaction_hash, block_number, from: tx.from, contract_address, logs })
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.state.lock().balance(address)
    }

    /// All deployed instances of an archetype, oldest first.
    pub fn deployments(&self, archetype: Archetype) -> Vec<Address> {
        self.state.lock().deployments(archetype)
    }

    /// The most recently deployed instance of an archetype.
    pub fn latest_deployment(&self, archetype: Archetype) -> Option<Address> {
        self.state.lock().latest_deployment(archetype)
    }

    pub fn entrance_fee(&self, lottery: Address) -> Result<U256, NodeError> {
        let state = self.state.lock();
        state.lottery(lottery)?.entrance_fee(&state)
    }

    pub fn lottery_phase(&self, lottery: Address) -> Result<LotteryPhase, NodeError> {
        Ok(self.state.lock().lottery(lottery)?.phase)
    }

    pub fn players(&self, lottery: Address) -> Result<Vec<Address>, NodeError> {
        Ok(self.state.lock().lottery(lottery)?.players.clone())
    }

    pub fn recent_winner(&self, lottery: Address) -> Result<Address, NodeError> {
        Ok(self.state.lock().lottery(lottery)?.recent_winner)
    }

    pub fn link_balance(&self, token: Address, owner: Address) -> Result<U256, NodeError> {
        self.state.lock().link_balance(token, owner)
    }

    pub fn latest_answer(&self, feed: Address) -> Result<I256, NodeError> {
        self.state.lock().latest_answer(feed)
    }

    pub fn decimals(&self, feed: Address) -> Result<u8, NodeError> {
        let state = self.state.lock();
        match state.contract(feed)? {
            ContractState::PriceFeed(feed_state) => Ok(feed_state.decimals),
            _ => Err(NodeError::WrongArchetype {
                address: feed,
                expected: Archetype::PriceFeed.name(),
            }),
        }
    }
}

fn instantiate(
    state: &NodeState,
    deployer: Address,
    deployment: Deployment,
) -> Result<ContractState, NodeError> {
    match deployment {
        Deployment::PriceFeed { decimals, initial_answer } => {
            Ok(ContractState::PriceFeed(PriceFeedState { decimals, answer: initial_answer }))
        }
        Deployment::LinkToken => Ok(ContractState::LinkToken(LinkTokenState::with_premine(deployer))),
        Deployment::VrfCoordinator { link_token } => {
            // the coordinator is constructed against the token it collects
            // fees in
            match state.contract(link_token)? {
                ContractState::LinkToken(_) => {
                    Ok(ContractState::VrfCoordinator(VrfCoordinatorState { nonce: 0 }))
                }
                _ => Err(NodeError::WrongArchetype {
                    address: link_token,
                    expected: Archetype::LinkToken.name(),
                }),
            }
        }
        Deployment::Lottery { price_feed, vrf_coordinator, link_token, fee, keyhash } => {
            Ok(ContractState::Lottery(LotteryState::new(
                deployer,
                price_feed,
                vrf_coordinator,
                link_token,
                fee,
                keyhash,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, b256};
    use lotto_bindings::decode_requested_randomness;

    const KEYHASH: B256 =
        b256!("2ed0feb3e7fd2022120aa84fab1945545a9f2ffc9076fd6156fa96eaff4c1311");

    fn accounts() -> Vec<Address> {
        (1..=3u8).map(Address::repeat_byte).collect()
    }

    fn node() -> DevNode {
        DevNode::new(NodeConfig::default().with_genesis_accounts(accounts()))
    }

    /// Deploys feed + token + coordinator + lottery from `owner` and
    /// returns their addresses in that order.
    fn deploy_stack(node: &DevNode, owner: Address) -> (Address, Address, Address, Address) {
        let feed = node
            .execute(DevTransaction::deploy(
                owner,
                Deployment::PriceFeed { decimals: 8, initial_answer: I256::try_from(200_000_000_000i64).unwrap() },
            ))
            .unwrap()
            .contract_address
            .unwrap();
        let link = node
            .execute(DevTransaction::deploy(owner, Deployment::LinkToken))
            .unwrap()
            .contract_address
            .unwrap();
        let vrf = node
            .execute(DevTransaction::deploy(owner, Deployment::VrfCoordinator { link_token: link }))
            .unwrap()
            .contract_address
            .unwrap();
        let lottery = node
            .execute(DevTransaction::deploy(
                owner,
                Deployment::Lottery {
                    price_feed: feed,
                    vrf_coordinator: vrf,
                    link_token: link,
                    fee: U256::from(100_000_000_000_000_000u64),
                    keyhash: KEYHASH,
                },
            ))
            .unwrap()
            .contract_address
            .unwrap();
        (feed, link, vrf, lottery)
    }

    #[test]
    fn genesis_accounts_are_funded() {
        let node = node();
        let expected = U256::from(10_000) * exp10(18);
        for account in accounts() {
            assert_eq!(node.balance(account), expected);
        }
        assert_eq!(node.balance(Address::repeat_byte(0x99)), U256::ZERO);
    }

    #[test]
    fn registry_orders_deployments_by_creation() {
        let node = node();
        let owner = accounts()[0];
        let first = node
            .execute(DevTransaction::deploy(
                owner,
                Deployment::PriceFeed { decimals: 8, initial_answer: I256::ONE },
            ))
            .unwrap()
            .contract_address
            .unwrap();
        let second = node
            .execute(DevTransaction::deploy(
                owner,
                Deployment::PriceFeed { decimals: 8, initial_answer: I256::ONE },
            ))
            .unwrap()
            .contract_address
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(node.deployments(Archetype::PriceFeed), vec![first, second]);
        assert_eq!(node.latest_deployment(Archetype::PriceFeed), Some(second));
        assert_eq!(node.latest_deployment(Archetype::Lottery), None);
    }

    #[test]
    fn token_premine_goes_to_the_deployer() {
        let node = node();
        let owner = accounts()[0];
        let (_, link, _, _) = deploy_stack(&node, owner);
        assert_eq!(node.link_balance(link, owner).unwrap(), exp10(27));

        let other = accounts()[1];
        node.execute(DevTransaction::call(
            owner,
            link,
            ContractCall::Transfer { to: other, amount: U256::from(7) },
        ))
        .unwrap();
        assert_eq!(node.link_balance(link, other).unwrap(), U256::from(7));

        let err = node
            .execute(DevTransaction::call(
                other,
                link,
                ContractCall::Transfer { to: owner, amount: U256::from(8) },
            ))
            .unwrap_err();
        assert!(err.to_string().contains("exceeds balance"), "{err}");
    }

    #[test]
    fn failed_calls_roll_back_the_value_transfer() {
        let node = node();
        let owner = accounts()[0];
        let (_, _, _, lottery) = deploy_stack(&node, owner);
        let before = node.balance(owner);

        // not started yet, so the entry reverts and the attached value must
        // come back
        let err = node
            .execute(DevTransaction::call_with_value(
                owner,
                lottery,
                U256::from(1_000_000u64),
                ContractCall::Enter,
            ))
            .unwrap_err();
        assert!(err.to_string().contains("not open"), "{err}");
        assert_eq!(node.balance(owner), before);
        assert_eq!(node.balance(lottery), U256::ZERO);
    }

    #[test]
    fn ending_without_token_funding_reverts() {
        let node = node();
        let owner = accounts()[0];
        let (_, _, _, lottery) = deploy_stack(&node, owner);
        node.execute(DevTransaction::call(owner, lottery, ContractCall::StartLottery)).unwrap();

        let err =
            node.execute(DevTransaction::call(owner, lottery, ContractCall::EndLottery)).unwrap_err();
        assert!(err.to_string().contains("exceeds balance"), "{err}");
        assert_eq!(node.lottery_phase(lottery).unwrap(), LotteryPhase::Open);
    }

    #[test]
    fn ending_emits_a_decodable_request_id() {
        let node = node();
        let owner = accounts()[0];
        let (_, link, vrf, lottery) = deploy_stack(&node, owner);
        node.execute(DevTransaction::call(owner, lottery, ContractCall::StartLottery)).unwrap();
        let fee = node.entrance_fee(lottery).unwrap();
        node.execute(DevTransaction::call_with_value(owner, lottery, fee, ContractCall::Enter))
            .unwrap();
        node.execute(DevTransaction::call(
            owner,
            link,
            ContractCall::Transfer { to: lottery, amount: U256::from(100_000_000_000_000_000u64) },
        ))
        .unwrap();

        let receipt =
            node.execute(DevTransaction::call(owner, lottery, ContractCall::EndLottery)).unwrap();
        let request_id = receipt
            .logs
            .iter()
            .find_map(|log| decode_requested_randomness(&log.data))
            .expect("end emits the randomness request event");
        assert_ne!(request_id, B256::ZERO);
        assert_eq!(node.lottery_phase(lottery).unwrap(), LotteryPhase::Calculating);
        // the fee moved from the lottery to the coordinator
        assert_eq!(node.link_balance(link, vrf).unwrap(), U256::from(100_000_000_000_000_000u64));
    }

    #[test]
    fn only_the_coordinator_may_fulfill() {
        let node = node();
        let owner = accounts()[0];
        let (_, link, vrf, lottery) = deploy_stack(&node, owner);
        node.execute(DevTransaction::call(owner, lottery, ContractCall::StartLottery)).unwrap();
        let fee = node.entrance_fee(lottery).unwrap();
        node.execute(DevTransaction::call_with_value(owner, lottery, fee, ContractCall::Enter))
            .unwrap();
        node.execute(DevTransaction::call(
            owner,
            link,
            ContractCall::Transfer { to: lottery, amount: U256::from(100_000_000_000_000_000u64) },
        ))
        .unwrap();
        node.execute(DevTransaction::call(owner, lottery, ContractCall::EndLottery)).unwrap();

        // a second coordinator deployed next to the real one is not the one
        // the lottery was constructed against
        let impostor = node
            .execute(DevTransaction::deploy(owner, Deployment::VrfCoordinator { link_token: link }))
            .unwrap()
            .contract_address
            .unwrap();
        let err = node
            .execute(DevTransaction::call(
                owner,
                impostor,
                ContractCall::CallBackWithRandomness {
                    request_id: B256::ZERO,
                    randomness: U256::from(777),
                    consumer: lottery,
                },
            ))
            .unwrap_err();
        assert!(err.to_string().contains("coordinator"), "{err}");

        node.execute(DevTransaction::call(
            owner,
            vrf,
            ContractCall::CallBackWithRandomness {
                request_id: B256::ZERO,
                randomness: U256::from(777),
                consumer: lottery,
            },
        ))
        .unwrap();
        assert_eq!(node.recent_winner(lottery).unwrap(), owner);
    }

    #[test]
    fn updating_the_feed_answer_moves_the_entrance_fee() {
        let node = node();
        let owner = accounts()[0];
        let (feed, _, _, lottery) = deploy_stack(&node, owner);
        // 50 USD at 2,000 USD/ETH
        assert_eq!(node.entrance_fee(lottery).unwrap(), U256::from(25_000_000_000_000_000u64));

        node.execute(DevTransaction::call(
            owner,
            feed,
            ContractCall::UpdateAnswer { answer: I256::try_from(400_000_000_000i64).unwrap() },
        ))
        .unwrap();
        // 50 USD at 4,000 USD/ETH
        assert_eq!(node.latest_answer(feed).unwrap(), I256::try_from(400_000_000_000i64).unwrap());
        assert_eq!(node.entrance_fee(lottery).unwrap(), U256::from(12_500_000_000_000_000u64));
    }

    #[test]
    fn calls_against_the_wrong_archetype_fail() {
        let node = node();
        let owner = accounts()[0];
        let (feed, _, _, _) = deploy_stack(&node, owner);
        let err = node
            .execute(DevTransaction::call(
                owner,
                feed,
                ContractCall::Transfer { to: owner, amount: U256::ONE },
            ))
            .unwrap_err();
        assert!(matches!(err, NodeError::WrongArchetype { .. }), "{err}");
        assert_eq!(node.decimals(feed).unwrap(), 8);
    }
}
