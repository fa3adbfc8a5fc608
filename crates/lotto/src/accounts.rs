//! Signing-identity resolution. Resolution happens per operation and never
//! caches: explicit dev-account index, then explicit keystore id, then the
//! default dev account on local networks, then the configured private key.

use alloy_primitives::Address;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use clap::Parser;
use eyre::{Context, Result};
use lotto_config::interpolate_env;

use crate::Lotto;

/// Mnemonic behind the deterministic dev accounts: the same ten accounts
/// every common dev node funds at genesis.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Number of funded dev accounts.
pub const DEV_ACCOUNTS: usize = 10;

/// Environment variable holding the keystore password.
pub const PASSWORD_ENV: &str = "LOTTO_PASSWORD";

/// Wallet options, flattened into every transacting subcommand.
#[derive(Clone, Debug, Default, Parser)]
#[command(next_help_heading = "Wallet options")]
pub struct WalletOpts {
    /// Use the dev account at the given index.
    #[arg(long, value_name = "INDEX")]
    pub index: Option<usize>,

    /// Use the keystore account with the given id.
    #[arg(long, value_name = "ID")]
    pub account: Option<String>,
}

/// Signer for the dev account at `index`. An out-of-range index fails in
/// the derivation machinery, not here.
pub fn dev_signer(index: usize) -> Result<PrivateKeySigner> {
    let signer =
        MnemonicBuilder::<English>::default().phrase(DEV_MNEMONIC).index(index as u32)?.build()?;
    Ok(signer)
}

/// Addresses of the ten dev accounts, used as the dev ledger's genesis.
pub fn dev_addresses() -> Result<Vec<Address>> {
    (0..DEV_ACCOUNTS).map(|index| Ok(dev_signer(index)?.address())).collect()
}

impl Lotto {
    /// Resolves the signing identity for one operation.
    pub fn resolve_account(&self, opts: &WalletOpts) -> Result<PrivateKeySigner> {
        if let Some(index) = opts.index {
            return dev_signer(index);
        }
        if let Some(id) = &opts.account {
            let path = self.config.wallets.keystores.join(format!("{id}.json"));
            let password = std::env::var(PASSWORD_ENV)
                .wrap_err_with(|| format!("{PASSWORD_ENV} must be set to unlock a keystore"))?;
            return PrivateKeySigner::decrypt_keystore(&path, password)
                .wrap_err_with(|| format!("failed to unlock keystore `{}`", path.display()));
        }
        if self.kind.is_local() {
            return dev_signer(0);
        }
        let raw = self.config.wallets.from_key.as_deref().ok_or_else(|| {
            eyre::eyre!("no wallets.from_key configured for live network `{}`", self.network)
        })?;
        let key = interpolate_env(raw)?;
        key.parse::<PrivateKeySigner>().wrap_err("invalid wallets.from_key private key")
    }
}
