use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Address, B256, I256, U256, keccak256};

use crate::{
    NodeError,
    contracts::{Archetype, ContractState, LotteryState},
};

/// The whole ledger, behind the node's lock. Execution works on a clone
/// that replaces the committed state only if the transaction succeeds.
#[derive(Clone, Debug)]
pub(crate) struct NodeState {
    pub height: u64,
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    contracts: HashMap<Address, ContractState>,
    registry: BTreeMap<Archetype, Vec<Address>>,
}

impl NodeState {
    pub fn new(genesis_accounts: &[Address], genesis_balance: U256) -> Self {
        Self {
            height: 0,
            nonces: HashMap::new(),
            balances: genesis_accounts.iter().map(|account| (*account, genesis_balance)).collect(),
            contracts: HashMap::new(),
            registry: BTreeMap::new(),
        }
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    pub fn nonce(&self, address: Address) -> u64 {
        self.nonces.get(&address).copied().unwrap_or_default()
    }

    pub fn bump_nonce(&mut self, address: Address) {
        *self.nonces.entry(address).or_default() += 1;
    }

    /// Moves native value between accounts, contract or otherwise.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), NodeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let available = self.balance(from);
        if available < amount {
            return Err(NodeError::InsufficientFunds { address: from, needed: amount, available });
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    /// Address the next deployment by `deployer` will land at.
    pub fn create_address(&self, deployer: Address) -> Address {
        let mut buf = [0u8; 28];
        buf[..20].copy_from_slice(deployer.as_slice());
        buf[20..].copy_from_slice(&self.nonce(deployer).to_be_bytes());
        Address::from_slice(&keccak256(buf)[12..])
    }

    pub fn insert_contract(&mut self, address: Address, contract: ContractState) {
        self.registry.entry(contract.archetype()).or_default().push(address);
        self.contracts.insert(address, contract);
    }

    pub fn contract(&self, address: Address) -> Result<&ContractState, NodeError> {
        self.contracts.get(&address).ok_or(NodeError::UnknownContract(address))
    }

    /// Detaches a contract so its handler can touch the rest of the state
    /// without aliasing. Callers must put it back.
    pub fn take_contract(&mut self, address: Address) -> Result<ContractState, NodeError> {
        self.contracts.remove(&address).ok_or(NodeError::UnknownContract(address))
    }

    pub fn put_contract(&mut self, address: Address, contract: ContractState) {
        self.contracts.insert(address, contract);
    }

    pub fn deployments(&self, archetype: Archetype) -> Vec<Address> {
        self.registry.get(&archetype).cloned().unwrap_or_default()
    }

    pub fn latest_deployment(&self, archetype: Archetype) -> Option<Address> {
        self.registry.get(&archetype).and_then(|deployed| deployed.last().copied())
    }

    pub fn lottery(&self, address: Address) -> Result<&LotteryState, NodeError> {
        match self.contract(address)? {
            ContractState::Lottery(lottery) => Ok(lottery),
            _ => Err(NodeError::WrongArchetype { address, expected: Archetype::Lottery.name() }),
        }
    }

    pub fn latest_answer(&self, feed: Address) -> Result<I256, NodeError> {
        match self.contract(feed)? {
            ContractState::PriceFeed(state) => Ok(state.answer),
            _ => Err(NodeError::WrongArchetype {
                address: feed,
                expected: Archetype::PriceFeed.name(),
            }),
        }
    }

    pub fn link_balance(&self, token: Address, owner: Address) -> Result<U256, NodeError> {
        match self.contract(token)? {
            ContractState::LinkToken(state) => {
                Ok(state.balances.get(&owner).copied().unwrap_or_default())
            }
            _ => Err(NodeError::WrongArchetype {
                address: token,
                expected: Archetype::LinkToken.name(),
            }),
        }
    }

    /// Token transfer used by detached contract handlers (the lottery pays
    /// the coordinator its fee while its own state is checked out).
    pub fn link_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), NodeError> {
        match self.contracts.get_mut(&token).ok_or(NodeError::UnknownContract(token))? {
            ContractState::LinkToken(state) => state.transfer(from, to, amount),
            _ => Err(NodeError::WrongArchetype {
                address: token,
                expected: Archetype::LinkToken.name(),
            }),
        }
    }

    /// Registers a randomness request with the coordinator and returns the
    /// request id derived from the key hash and the coordinator's nonce.
    pub fn vrf_request(&mut self, coordinator: Address, keyhash: B256) -> Result<B256, NodeError> {
        match self.contracts.get_mut(&coordinator).ok_or(NodeError::UnknownContract(coordinator))? {
            ContractState::VrfCoordinator(state) => {
                state.nonce += 1;
                let mut buf = [0u8; 40];
                buf[..32].copy_from_slice(keyhash.as_slice());
                buf[32..].copy_from_slice(&state.nonce.to_be_bytes());
                Ok(keccak256(buf))
            }
            _ => Err(NodeError::WrongArchetype {
                address: coordinator,
                expected: Archetype::VrfCoordinator.name(),
            }),
        }
    }
}
