use thiserror::Error;

/// Errors produced while loading or querying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested network has no `[networks.<name>]` entry.
    #[error("unknown network `{0}`: no [networks.{0}] entry in lotto.toml")]
    UnknownNetwork(String),

    /// A per-network field the current operation needs is absent.
    #[error("network `{network}` is missing required config field `{field}`")]
    MissingField { network: String, field: &'static str },

    /// A `${VAR}` placeholder referenced an unset environment variable.
    #[error("environment variable `{0}` referenced by the config is not set")]
    UnsetEnvVar(String),

    /// The resolved RPC endpoint is not a valid URL.
    #[error("network `{network}` has an invalid rpc_url: {source}")]
    InvalidRpcUrl {
        network: String,
        #[source]
        source: url::ParseError,
    },

    /// Figment failed to read or merge the underlying providers.
    #[error(transparent)]
    Extract(#[from] figment::Error),
}
