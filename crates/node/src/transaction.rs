use alloy_primitives::{Address, B256, I256, LogData, U256};

/// A transaction submitted to the dev ledger. There are no signatures:
/// like a dev node running with auto-impersonation, the ledger takes the
/// `from` address at face value.
#[derive(Clone, Debug)]
pub struct DevTransaction {
    pub from: Address,
    pub value: U256,
    pub action: TxAction,
}

impl DevTransaction {
    /// A zero-value call to a deployed contract.
    pub fn call(from: Address, to: Address, call: ContractCall) -> Self {
        Self { from, value: U256::ZERO, action: TxAction::Call { to, call } }
    }

    /// A value-carrying call to a deployed contract.
    pub fn call_with_value(from: Address, to: Address, value: U256, call: ContractCall) -> Self {
        Self { from, value, action: TxAction::Call { to, call } }
    }

    /// A contract deployment.
    pub fn deploy(from: Address, deployment: Deployment) -> Self {
        Self { from, value: U256::ZERO, action: TxAction::Deploy(deployment) }
    }
}

#[derive(Clone, Debug)]
pub enum TxAction {
    Deploy(Deployment),
    Call { to: Address, call: ContractCall },
}

/// Constructor arguments for each native contract archetype.
#[derive(Clone, Debug)]
pub enum Deployment {
    PriceFeed { decimals: u8, initial_answer: I256 },
    LinkToken,
    VrfCoordinator { link_token: Address },
    Lottery { price_feed: Address, vrf_coordinator: Address, link_token: Address, fee: U256, keyhash: B256 },
}

/// The callable surface of the native contracts, mirroring the `sol!`
/// interfaces in `lotto-bindings`.
#[derive(Clone, Debug)]
pub enum ContractCall {
    // price feed
    UpdateAnswer { answer: I256 },
    // utility token
    Transfer { to: Address, amount: U256 },
    // lottery
    StartLottery,
    Enter,
    EndLottery,
    // randomness coordinator
    CallBackWithRandomness { request_id: B256, randomness: U256, consumer: Address },
}

/// Receipt for a successfully executed [`DevTransaction`]. Failed
/// transactions return a [`crate::NodeError`] instead and leave no trace in
/// the ledger.
#[derive(Clone, Debug)]
pub struct DevReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub from: Address,
    /// Address of the created contract for deployments.
    pub contract_address: Option<Address>,
    pub logs: Vec<LogRecord>,
}

/// A log emitted during execution, ABI-encoded exactly as the deployed
/// contract would emit it.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub address: Address,
    pub data: LogData,
}
