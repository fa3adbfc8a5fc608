use std::{path::PathBuf, time::Duration};

use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use eyre::Result;
use lotto::{
    Lotto,
    accounts::WalletOpts,
    config::Config,
    lifecycle::{DEFAULT_WINNER_TIMEOUT, Lottery},
};

/// Deploy and drive the VRF lottery across dev and live networks.
#[derive(Parser)]
#[command(name = "lotto", version, about)]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Network to operate on; defaults to the config's default_network.
    #[arg(long, global = true, value_name = "NAME")]
    network: Option<String>,

    /// Path to the configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy a new lottery instance and print its address.
    Deploy {
        #[command(flatten)]
        wallet: WalletOpts,
    },

    /// Open the most recently deployed lottery for entries.
    Start {
        #[command(flatten)]
        wallet: WalletOpts,
    },

    /// Enter the most recently deployed lottery.
    Enter {
        /// Entry value in wei; defaults to the entrance fee plus a small
        /// cushion.
        #[arg(long)]
        value: Option<U256>,

        #[command(flatten)]
        wallet: WalletOpts,
    },

    /// Fund the lottery, end it, and wait for the winner.
    End {
        /// Seconds to wait for the randomness responder.
        #[arg(long, default_value_t = DEFAULT_WINNER_TIMEOUT.as_secs())]
        timeout: u64,

        #[command(flatten)]
        wallet: WalletOpts,
    },

    /// Run the whole lifecycle: deploy, start, enter, end, report the
    /// winner.
    Run {
        /// Seconds to wait for the randomness responder.
        #[arg(long, default_value_t = DEFAULT_WINNER_TIMEOUT.as_secs())]
        timeout: u64,

        #[command(flatten)]
        wallet: WalletOpts,
    },
}

fn main() -> Result<()> {
    subscriber();
    let args = Args::parse();
    run(args)
}

/// Initializes a tracing subscriber for logging, filtered by `RUST_LOG`.
fn subscriber() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let lotto = Lotto::connect(config, args.network)?;

    match args.cmd {
        Command::Deploy { wallet } => {
            let lottery = lotto.deploy_lottery(&wallet).await?;
            println!("{}", lottery.address);
        }
        Command::Start { wallet } => {
            let lottery = require_lottery(&lotto)?;
            lotto.start_lottery(&lottery, &wallet).await?;
            println!("the lottery is started");
        }
        Command::Enter { value, wallet } => {
            let lottery = require_lottery(&lotto)?;
            lotto.enter_lottery(&lottery, &wallet, value).await?;
            println!("you entered the lottery");
        }
        Command::End { timeout, wallet } => {
            let lottery = require_lottery(&lotto)?;
            lotto.end_lottery(&lottery, &wallet).await?;
            let winner = lotto.await_winner(&lottery, Duration::from_secs(timeout)).await?;
            println!("{winner} is the new winner!");
        }
        Command::Run { timeout, wallet } => {
            let winner = lotto.run_lifecycle(&wallet, Duration::from_secs(timeout)).await?;
            println!("{winner} is the new winner!");
        }
    }
    Ok(())
}

fn require_lottery(lotto: &Lotto) -> Result<Lottery> {
    lotto.latest_lottery()?.ok_or_else(|| {
        eyre::eyre!(
            "no lottery deployed on network `{}` yet; run `lotto deploy` first",
            lotto.network
        )
    })
}
