//! # lotto-config
//!
//! Configuration for the lottery harness: a `lotto.toml` file merged with
//! `LOTTO_`-prefixed environment variables over built-in defaults, plus the
//! classification of network names into local-dev, forked-local and live
//! environments that the account and contract resolvers key off.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, B256, U256, b256};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

mod error;
pub use error::ConfigError;

/// Default configuration file name, resolved relative to the working
/// directory.
pub const CONFIG_FILE_NAME: &str = "lotto.toml";

/// Network names treated as throwaway local development chains. Dependency
/// contracts are mocked here.
pub const LOCAL_DEV_NETWORKS: &[&str] = &["dev", "development", "anvil"];

/// Network names for a local node forked off a live chain. Accounts behave
/// like local-dev, but dependency contracts resolve to their live addresses.
pub const FORKED_NETWORKS: &[&str] = &["mainnet-fork", "mainnet-fork-dev"];

/// Category of the active network, recomputed from the name on every query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkKind {
    LocalDev,
    ForkedLocal,
    Live,
}

impl NetworkKind {
    /// Classifies a network name by membership in the two fixed lists.
    pub fn classify(name: &str) -> Self {
        if LOCAL_DEV_NETWORKS.contains(&name) {
            Self::LocalDev
        } else if FORKED_NETWORKS.contains(&name) {
            Self::ForkedLocal
        } else {
            Self::Live
        }
    }

    /// True only for throwaway dev chains, where mocks are deployed.
    pub fn is_local_dev(self) -> bool {
        matches!(self, Self::LocalDev)
    }

    /// True for dev and forked chains alike; these get the default funded
    /// dev account rather than a configured key.
    pub fn is_local(self) -> bool {
        matches!(self, Self::LocalDev | Self::ForkedLocal)
    }
}

/// Top-level harness configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Network used when none is given on the command line.
    pub default_network: String,
    pub wallets: WalletsConfig,
    /// Per-network profiles, keyed by network name.
    pub networks: BTreeMap<String, NetworkProfile>,
}

/// Signing identity configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletsConfig {
    /// Private key used on live networks when no keystore account is named.
    /// Usually an `${ENV_VAR}` placeholder rather than a literal key.
    pub from_key: Option<String>,
    /// Directory holding `<id>.json` keystore files.
    pub keystores: PathBuf,
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self { from_key: None, keystores: PathBuf::from("keystores") }
    }
}

/// Everything the harness needs to know about one network.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkProfile {
    /// RPC endpoint. Supports `${ENV_VAR}` placeholders. Not used (or
    /// required) on local-dev networks.
    pub rpc_url: Option<String>,
    /// Randomness request fee, in the utility token's smallest unit.
    pub fee: Option<U256>,
    /// Key hash identifying the randomness oracle job.
    pub keyhash: Option<B256>,
    pub eth_usd_price_feed: Option<Address>,
    pub vrf_coordinator: Option<Address>,
    pub link_token: Option<Address>,
    /// Whether source verification should be requested on deployment.
    pub verify: bool,
    /// Path to a forge-style artifact JSON providing the lottery's
    /// deployment bytecode. Required to deploy on non-dev networks.
    pub lottery_artifact: Option<PathBuf>,
}

/// Fee baked into the default dev profile: 0.1 LINK.
const DEV_FEE: u64 = 100_000_000_000_000_000;

/// Key hash baked into the default dev profile. The mock coordinator does
/// not check it, but the lottery constructor wants one.
const DEV_KEYHASH: B256 =
    b256!("2ed0feb3e7fd2022120aa84fab1945545a9f2ffc9076fd6156fa96eaff4c1311");

impl Default for Config {
    fn default() -> Self {
        let dev = NetworkProfile {
            fee: Some(U256::from(DEV_FEE)),
            keyhash: Some(DEV_KEYHASH),
            ..Default::default()
        };
        Self {
            default_network: "dev".to_string(),
            wallets: WalletsConfig::default(),
            networks: BTreeMap::from([("dev".to_string(), dev)]),
        }
    }
}

impl Config {
    /// Loads the nearest `lotto.toml`, if any, over the built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::find_config_file())
    }

    /// Walks up from the working directory looking for a config file, so
    /// the harness behaves the same from anywhere inside the project.
    pub fn find_config_file() -> PathBuf {
        if let Ok(cwd) = std::env::current_dir() {
            let mut dir = Some(cwd.as_path());
            while let Some(current) = dir {
                let candidate = current.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    return candidate;
                }
                dir = current.parent();
            }
        }
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Loads configuration from the given file over the built-in defaults,
    /// then applies `LOTTO_`-prefixed environment variables on top.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        trace!(path = %path.display(), "loading config");
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOTTO_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Returns the profile for `name`, failing with the network name if no
    /// entry exists.
    pub fn network(&self, name: &str) -> Result<&NetworkProfile, ConfigError> {
        self.networks.get(name).ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }
}

impl NetworkProfile {
    /// Resolved RPC endpoint for this network.
    pub fn rpc_url(&self, network: &str) -> Result<Url, ConfigError> {
        let raw = self
            .rpc_url
            .as_deref()
            .ok_or(ConfigError::MissingField { network: network.to_string(), field: "rpc_url" })?;
        let resolved = interpolate_env(raw)?;
        Url::parse(&resolved).map_err(|source| ConfigError::InvalidRpcUrl {
            network: network.to_string(),
            source,
        })
    }

    pub fn fee(&self, network: &str) -> Result<U256, ConfigError> {
        self.fee.ok_or(ConfigError::MissingField { network: network.to_string(), field: "fee" })
    }

    pub fn keyhash(&self, network: &str) -> Result<B256, ConfigError> {
        self.keyhash
            .ok_or(ConfigError::MissingField { network: network.to_string(), field: "keyhash" })
    }
}

/// Resolves an `${ENV_VAR}` placeholder against the process environment.
/// Values that are not placeholders pass through untouched.
pub fn interpolate_env(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var) => std::env::var(var).map_err(|_| ConfigError::UnsetEnvVar(var.to_string())),
        None => Ok(value.to_string()),
    }
}
