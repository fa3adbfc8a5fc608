//! Lifecycle tests against the in-process dev ledger. These run on every
//! machine; the live-network counterpart lives in `live.rs`.

use std::time::Duration;

use alloy_primitives::U256;
use lotto::{
    Lotto,
    accounts::{WalletOpts, dev_signer},
    bindings::LotteryPhase,
    config::Config,
    contracts::{DEFAULT_LINK_FUNDING, LogicalContract},
    node::Archetype,
};

fn dev_harness() -> Lotto {
    Lotto::connect(Config::default(), Some("dev".to_string())).unwrap()
}

fn wallet(index: usize) -> WalletOpts {
    WalletOpts { index: Some(index), account: None }
}

#[tokio::test]
async fn entrance_fee_matches_the_mock_feed_price() {
    let lotto = dev_harness();
    let lottery = lotto.deploy_lottery(&WalletOpts::default()).await.unwrap();
    // 2,000 USD per ETH and a 50 USD entry price: 0.025 ether
    let expected = U256::from(25_000_000_000_000_000u64);
    assert_eq!(lotto.entrance_fee(&lottery).await.unwrap(), expected);
}

#[tokio::test]
async fn cant_enter_unless_started() {
    let lotto = dev_harness();
    let lottery = lotto.deploy_lottery(&WalletOpts::default()).await.unwrap();
    let err = lotto.enter_lottery(&lottery, &WalletOpts::default(), None).await.unwrap_err();
    assert!(err.to_string().contains("not open"), "{err}");
}

#[tokio::test]
async fn can_start_and_enter_lottery() {
    let lotto = dev_harness();
    let opts = WalletOpts::default();
    let lottery = lotto.deploy_lottery(&opts).await.unwrap();
    lotto.start_lottery(&lottery, &opts).await.unwrap();
    lotto.enter_lottery(&lottery, &opts, None).await.unwrap();

    let account = dev_signer(0).unwrap().address();
    assert_eq!(lotto.player(&lottery, 0).await.unwrap(), account);
}

#[tokio::test]
async fn can_end_lottery() {
    let lotto = dev_harness();
    let opts = WalletOpts::default();
    let lottery = lotto.deploy_lottery(&opts).await.unwrap();
    lotto.start_lottery(&lottery, &opts).await.unwrap();
    lotto.enter_lottery(&lottery, &opts, None).await.unwrap();
    lotto.end_lottery(&lottery, &opts).await.unwrap();

    assert_eq!(lotto.lottery_phase(&lottery).await.unwrap(), LotteryPhase::Calculating);
}

#[tokio::test]
async fn can_pick_winner_correctly() {
    let lotto = dev_harness();
    let owner = WalletOpts::default();
    let lottery = lotto.deploy_lottery(&owner).await.unwrap();
    lotto.start_lottery(&lottery, &owner).await.unwrap();
    lotto.enter_lottery(&lottery, &wallet(0), None).await.unwrap();
    lotto.enter_lottery(&lottery, &wallet(1), None).await.unwrap();
    lotto.enter_lottery(&lottery, &wallet(2), None).await.unwrap();

    let node = lotto.dev_node().unwrap();
    let entrant = dev_signer(0).unwrap().address();
    let starting_balance = node.balance(entrant);
    let pot = node.balance(lottery.address);

    let request_id = lotto
        .end_lottery(&lottery, &owner)
        .await
        .unwrap()
        .expect("end emits a randomness request id");

    let account = lotto.resolve_account(&owner).unwrap();
    let coordinator = lotto.get_contract(LogicalContract::VrfCoordinator, &account).await.unwrap();
    lotto
        .fulfill_randomness(coordinator, &lottery, request_id, U256::from(777u64), &owner)
        .await
        .unwrap();

    // 777 % 3 == 0: the first entrant takes the whole pot, and the dev
    // ledger charges no gas, so the balance math is exact
    assert_eq!(lotto.recent_winner(&lottery).await.unwrap(), entrant);
    assert_eq!(lotto.pot_balance(&lottery).await.unwrap(), U256::ZERO);
    assert_eq!(node.balance(entrant), starting_balance + pot);
}

#[tokio::test]
async fn resolving_one_dependency_deploys_the_whole_mock_bundle() {
    let lotto = dev_harness();
    let node = lotto.dev_node().unwrap();
    let mocks = [Archetype::PriceFeed, Archetype::LinkToken, Archetype::VrfCoordinator];
    for archetype in mocks {
        assert!(node.deployments(archetype).is_empty());
    }

    let account = lotto.resolve_account(&WalletOpts::default()).unwrap();
    lotto.get_contract(LogicalContract::VrfCoordinator, &account).await.unwrap();
    for archetype in mocks {
        assert_eq!(node.deployments(archetype).len(), 1, "{}", archetype.name());
    }

    // a second resolution reuses the existing instances
    lotto.get_contract(LogicalContract::EthUsdPriceFeed, &account).await.unwrap();
    for archetype in mocks {
        assert_eq!(node.deployments(archetype).len(), 1, "{}", archetype.name());
    }
}

#[tokio::test]
async fn funding_moves_the_default_amount() {
    let lotto = dev_harness();
    let lottery = lotto.deploy_lottery(&WalletOpts::default()).await.unwrap();
    lotto.fund_with_link(lottery.address, None, None, None).await.unwrap();

    let node = lotto.dev_node().unwrap();
    let account = lotto.resolve_account(&WalletOpts::default()).unwrap();
    let link = lotto.get_contract(LogicalContract::LinkToken, &account).await.unwrap();
    assert_eq!(
        node.link_balance(link, lottery.address).unwrap(),
        U256::from(DEFAULT_LINK_FUNDING)
    );
}

#[tokio::test]
async fn await_winner_fails_without_a_responder() {
    let lotto = dev_harness();
    let opts = WalletOpts::default();
    let lottery = lotto.deploy_lottery(&opts).await.unwrap();
    lotto.start_lottery(&lottery, &opts).await.unwrap();
    lotto.enter_lottery(&lottery, &opts, None).await.unwrap();
    lotto.end_lottery(&lottery, &opts).await.unwrap();

    let err = lotto.await_winner(&lottery, Duration::from_millis(200)).await.unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
}

#[tokio::test]
async fn run_lifecycle_selects_a_winner_on_dev() {
    let lotto = dev_harness();
    let winner =
        lotto.run_lifecycle(&WalletOpts::default(), Duration::from_secs(5)).await.unwrap();
    // one entrant, so any randomness picks dev account zero
    assert_eq!(winner, dev_signer(0).unwrap().address());
}

#[tokio::test]
async fn latest_lottery_tracks_the_most_recent_deployment() {
    let lotto = dev_harness();
    assert!(lotto.latest_lottery().unwrap().is_none());

    let opts = WalletOpts::default();
    lotto.deploy_lottery(&opts).await.unwrap();
    let second = lotto.deploy_lottery(&opts).await.unwrap();
    assert_eq!(lotto.latest_lottery().unwrap().unwrap().address, second.address);
}
