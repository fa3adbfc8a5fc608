//! The full lifecycle against a real network with a real randomness
//! responder. Points at whatever `LOTTO_TEST_NETWORK` names and reports
//! itself as not applicable anywhere else.

use std::time::Duration;

use alloy_primitives::U256;
use lotto::{
    Lotto,
    accounts::WalletOpts,
    config::{Config, NetworkKind},
};

#[tokio::test(flavor = "multi_thread")]
async fn picks_a_winner_with_the_real_responder() {
    let Ok(network) = std::env::var("LOTTO_TEST_NETWORK") else {
        eprintln!("skipping: LOTTO_TEST_NETWORK is not set");
        return;
    };
    if NetworkKind::classify(&network).is_local() {
        eprintln!("skipping: `{network}` is not a live network");
        return;
    }

    let config = Config::load().unwrap();
    let lotto = Lotto::connect(config, Some(network)).unwrap();
    let opts = WalletOpts::default();
    let account = lotto.resolve_account(&opts).unwrap();

    let lottery = lotto.deploy_lottery(&opts).await.unwrap();
    lotto.start_lottery(&lottery, &opts).await.unwrap();
    lotto.enter_lottery(&lottery, &opts, None).await.unwrap();
    lotto.enter_lottery(&lottery, &opts, None).await.unwrap();
    lotto.end_lottery(&lottery, &opts).await.unwrap();

    // both entries belong to the test account, so it wins either way
    let winner = lotto.await_winner(&lottery, Duration::from_secs(180)).await.unwrap();
    assert_eq!(winner, account.address());
    assert_eq!(lotto.pot_balance(&lottery).await.unwrap(), U256::ZERO);
}
