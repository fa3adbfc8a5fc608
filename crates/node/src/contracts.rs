//! Native implementations of the contracts the harness drives: the three
//! dependency mocks and the lottery itself. Semantics track the deployed
//! Solidity, including revert conditions and the randomness-request event.

use alloy_primitives::{Address, B256, I256, U256};
use lotto_bindings::{LotteryPhase, requested_randomness_log};
use tracing::debug;

use crate::{
    NodeError,
    state::NodeState,
    transaction::{ContractCall, LogRecord},
};

/// Implementation type of a deployed contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Archetype {
    PriceFeed,
    LinkToken,
    VrfCoordinator,
    Lottery,
}

impl Archetype {
    pub fn name(self) -> &'static str {
        match self {
            Self::PriceFeed => "price feed aggregator",
            Self::LinkToken => "utility token",
            Self::VrfCoordinator => "randomness coordinator",
            Self::Lottery => "lottery",
        }
    }
}

pub(crate) fn exp10(n: u8) -> U256 {
    U256::from(10).pow(U256::from(n))
}

/// Token units minted to the deployer of the utility token (1e27, the
/// standard premine of the reference token contract).
fn link_premine() -> U256 {
    exp10(27)
}

#[derive(Clone, Debug)]
pub(crate) enum ContractState {
    PriceFeed(PriceFeedState),
    LinkToken(LinkTokenState),
    VrfCoordinator(VrfCoordinatorState),
    Lottery(LotteryState),
}

impl ContractState {
    pub fn archetype(&self) -> Archetype {
        match self {
            Self::PriceFeed(_) => Archetype::PriceFeed,
            Self::LinkToken(_) => Archetype::LinkToken,
            Self::VrfCoordinator(_) => Archetype::VrfCoordinator,
            Self::Lottery(_) => Archetype::Lottery,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PriceFeedState {
    pub decimals: u8,
    pub answer: I256,
}

#[derive(Clone, Debug)]
pub(crate) struct LinkTokenState {
    pub balances: std::collections::HashMap<Address, U256>,
}

impl LinkTokenState {
    pub fn with_premine(deployer: Address) -> Self {
        Self { balances: std::collections::HashMap::from([(deployer, link_premine())]) }
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), NodeError> {
        let available = self.balances.get(&from).copied().unwrap_or_default();
        if available < amount {
            return Err(NodeError::revert("transfer amount exceeds balance"));
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct VrfCoordinatorState {
    pub nonce: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct LotteryState {
    pub owner: Address,
    pub price_feed: Address,
    pub vrf_coordinator: Address,
    pub link_token: Address,
    pub fee: U256,
    pub keyhash: B256,
    pub phase: LotteryPhase,
    pub players: Vec<Address>,
    pub recent_winner: Address,
}

impl LotteryState {
    pub fn new(
        owner: Address,
        price_feed: Address,
        vrf_coordinator: Address,
        link_token: Address,
        fee: U256,
        keyhash: B256,
    ) -> Self {
        Self {
            owner,
            price_feed,
            vrf_coordinator,
            link_token,
            fee,
            keyhash,
            phase: LotteryPhase::Closed,
            players: Vec::new(),
            recent_winner: Address::ZERO,
        }
    }

    /// Entry price in wei: a fixed 50 USD converted through the price
    /// feed's 8-decimal answer.
    pub fn entrance_fee(&self, state: &NodeState) -> Result<U256, NodeError> {
        let answer = state.latest_answer(self.price_feed)?;
        if answer <= I256::ZERO {
            return Err(NodeError::revert("price feed answer must be positive"));
        }
        let adjusted_price = answer.unsigned_abs() * exp10(10);
        Ok(U256::from(50) * exp10(18) * exp10(18) / adjusted_price)
    }

    fn start(&mut self, env: &CallEnv) -> Result<(), NodeError> {
        if env.caller != self.owner {
            return Err(NodeError::revert("only the owner can start the lottery"));
        }
        if self.phase != LotteryPhase::Closed {
            return Err(NodeError::revert("can't start a new lottery yet"));
        }
        self.phase = LotteryPhase::Open;
        Ok(())
    }

    fn enter(&mut self, state: &mut NodeState, env: &CallEnv) -> Result<(), NodeError> {
        if self.phase != LotteryPhase::Open {
            return Err(NodeError::revert("lottery is not open"));
        }
        let fee = self.entrance_fee(state)?;
        if env.value < fee {
            return Err(NodeError::revert("not enough ETH to enter"));
        }
        self.players.push(env.caller);
        Ok(())
    }

    fn end(&mut self, state: &mut NodeState, env: &CallEnv) -> Result<Vec<LogRecord>, NodeError> {
        if self.phase != LotteryPhase::Open {
            return Err(NodeError::revert("can't end a lottery that isn't open"));
        }
        // the randomness request is paid for in utility token held by the
        // lottery itself
        state.link_transfer(self.link_token, env.contract, self.vrf_coordinator, self.fee)?;
        let request_id = state.vrf_request(self.vrf_coordinator, self.keyhash)?;
        self.phase = LotteryPhase::Calculating;
        debug!(target: "node", %request_id, "randomness requested");
        Ok(vec![LogRecord { address: env.contract, data: requested_randomness_log(request_id) }])
    }

    fn fulfill(
        &mut self,
        state: &mut NodeState,
        own_address: Address,
        caller: Address,
        randomness: U256,
    ) -> Result<(), NodeError> {
        if caller != self.vrf_coordinator {
            return Err(NodeError::revert("only the randomness coordinator may fulfill"));
        }
        if self.phase != LotteryPhase::Calculating {
            return Err(NodeError::revert("lottery is not calculating a winner"));
        }
        if randomness.is_zero() {
            return Err(NodeError::revert("random-not-found"));
        }
        if self.players.is_empty() {
            return Err(NodeError::revert("no players entered"));
        }
        let index = (randomness % U256::from(self.players.len())).to::<usize>();
        let winner = self.players[index];
        let pot = state.balance(own_address);
        state.transfer(own_address, winner, pot)?;
        self.recent_winner = winner;
        self.players.clear();
        self.phase = LotteryPhase::Closed;
        debug!(target: "node", %winner, %pot, "winner selected and paid");
        Ok(())
    }
}

pub(crate) struct CallEnv {
    pub caller: Address,
    pub contract: Address,
    pub value: U256,
}

fn required_archetype(call: &ContractCall) -> Archetype {
    match call {
        ContractCall::UpdateAnswer { .. } => Archetype::PriceFeed,
        ContractCall::Transfer { .. } => Archetype::LinkToken,
        ContractCall::StartLottery | ContractCall::Enter | ContractCall::EndLottery => {
            Archetype::Lottery
        }
        ContractCall::CallBackWithRandomness { .. } => Archetype::VrfCoordinator,
    }
}

/// Runs a call against the contract at `env.contract`. The target is
/// detached from the state for the duration of the call so handlers can
/// reach other contracts and account balances freely.
pub(crate) fn dispatch(
    state: &mut NodeState,
    env: &CallEnv,
    call: ContractCall,
) -> Result<Vec<LogRecord>, NodeError> {
    let required = required_archetype(&call);
    let mut this = state.take_contract(env.contract)?;
    if this.archetype() != required {
        state.put_contract(env.contract, this);
        return Err(NodeError::WrongArchetype { address: env.contract, expected: required.name() });
    }
    let result = run_call(state, env, &mut this, call);
    state.put_contract(env.contract, this);
    result
}

fn run_call(
    state: &mut NodeState,
    env: &CallEnv,
    this: &mut ContractState,
    call: ContractCall,
) -> Result<Vec<LogRecord>, NodeError> {
    match (this, call) {
        (ContractState::PriceFeed(feed), ContractCall::UpdateAnswer { answer }) => {
            feed.answer = answer;
            Ok(Vec::new())
        }
        (ContractState::LinkToken(token), ContractCall::Transfer { to, amount }) => {
            token.transfer(env.caller, to, amount)?;
            Ok(Vec::new())
        }
        (ContractState::Lottery(lottery), ContractCall::StartLottery) => {
            lottery.start(env).map(|()| Vec::new())
        }
        (ContractState::Lottery(lottery), ContractCall::Enter) => {
            lottery.enter(state, env).map(|()| Vec::new())
        }
        (ContractState::Lottery(lottery), ContractCall::EndLottery) => lottery.end(state, env),
        (
            ContractState::VrfCoordinator(_),
            ContractCall::CallBackWithRandomness { request_id: _, randomness, consumer },
        ) => fulfill_randomness(state, env.contract, consumer, randomness),
        _ => unreachable!("archetype checked before dispatch"),
    }
}

/// The coordinator's callback entry point: forwards the random word into
/// the consumer contract, with the coordinator as the caller.
fn fulfill_randomness(
    state: &mut NodeState,
    coordinator: Address,
    consumer: Address,
    randomness: U256,
) -> Result<Vec<LogRecord>, NodeError> {
    let mut target = state.take_contract(consumer)?;
    let result = match &mut target {
        ContractState::Lottery(lottery) => lottery.fulfill(state, consumer, coordinator, randomness),
        _ => Err(NodeError::WrongArchetype { address: consumer, expected: Archetype::Lottery.name() }),
    };
    state.put_contract(consumer, target);
    result.map(|()| Vec::new())
}
