mod common;

use ad_rewards::balance::{BalanceSynchronizer, UserBalance};
use ad_rewards::config::RuntimeConfig;
use ad_rewards::error::MarketError;
use ad_rewards::reward::{RewardsDashboard, TimerState};
use ad_rewards::session::Session;
use common::*;
use std::time::Duration;

const ADDRESS: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

fn fast_runtime(seconds: u32) -> RuntimeConfig {
    RuntimeConfig {
        ad_watch_seconds: seconds,
        tick_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

fn connected() -> Session {
    let mut session = Session::new();
    session.connect(ADDRESS);
    session
}

async fn dashboard(base_url: &str, seconds: u32) -> RewardsDashboard {
    let synchronizer = BalanceSynchronizer::new(base_url).unwrap();
    RewardsDashboard::load(&connected(), synchronizer, &fast_runtime(seconds))
        .await
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_dashboard_requires_wallet() {
    let synchronizer = BalanceSynchronizer::new(DEAD_URL).unwrap();
    let err = RewardsDashboard::load(&Session::new(), synchronizer, &fast_runtime(3))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, MarketError::WalletNotConnected));
}

#[test_log::test(tokio::test)]
async fn test_completed_watch_grants_once_and_persists() {
    let pinata = serve(fake_pinata());
    let (app, _store) = spawn_app(DEAD_URL, Some(&pinata));
    let dashboard = dashboard(&app, 3).await;
    assert_eq!(dashboard.balance().await, UserBalance::default_for_new_user());

    let watch = dashboard.watch_ad().unwrap();
    assert_eq!(watch.remaining(), Some(3));

    let rewarded = watch.finished().await.unwrap();
    assert_eq!(rewarded.tokens, 2);
    assert_eq!(rewarded.ad_performance.impressions, 1001);
    assert_eq!(rewarded.ad_performance.clicks, 51);
    assert_eq!(rewarded.ad_performance.earnings, 500.5);
    assert_eq!(rewarded.token_history, vec![59.0, 80.0, 81.0, 56.0, 55.0, 56.0]);
    assert_eq!(dashboard.timer_state(), TimerState::Idle);

    // Nothing more arrives without a new watch
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(dashboard.balance().await.tokens, 2);

    let remote = BalanceSynchronizer::new(&app).unwrap().fetch(ADDRESS).await;
    assert_eq!(remote, rewarded);
}

#[test_log::test(tokio::test)]
async fn test_start_while_watching_is_refused() {
    let dashboard = dashboard(DEAD_URL, 3).await;
    let watch = dashboard.watch_ad().unwrap();

    let err = dashboard.watch_ad().err().unwrap();
    assert!(matches!(err, MarketError::AlreadyWatching { .. }));

    // The refused start did not disturb the running countdown
    let rewarded = watch.finished().await.unwrap();
    assert_eq!(rewarded.tokens, 2);
}

#[test_log::test(tokio::test)]
async fn test_dropped_watch_grants_nothing() {
    let dashboard = dashboard(DEAD_URL, 50).await;

    let watch = dashboard.watch_ad().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(watch);

    assert_eq!(dashboard.timer_state(), TimerState::Idle);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(dashboard.balance().await.tokens, 1);

    let watch = dashboard.watch_ad().unwrap();
    watch.cancel();
    assert_eq!(dashboard.timer_state(), TimerState::Idle);
}

#[test_log::test(tokio::test)]
async fn test_repeated_watches_accumulate() {
    let dashboard = dashboard(DEAD_URL, 2).await;

    for _ in 0..3 {
        dashboard.watch_ad().unwrap().finished().await.unwrap();
    }

    let balance = dashboard.balance().await;
    assert_eq!(balance.tokens, 4);
    assert_eq!(balance.ad_performance.earnings, 501.5);
    assert_eq!(balance.token_history.len(), 6);
}

async fn wait_for_tokens(dashboard: &RewardsDashboard, tokens: u64) {
    for _ in 0..200 {
        if dashboard.balance().await.tokens == tokens {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("balance never reached {} tokens", tokens);
}

#[test_log::test(tokio::test)]
async fn test_old_handle_leaves_next_watch_running() {
    let dashboard = dashboard(DEAD_URL, 3).await;

    let first = dashboard.watch_ad().unwrap();
    wait_for_tokens(&dashboard, 2).await;
    assert_eq!(dashboard.timer_state(), TimerState::Idle);

    let second = dashboard.watch_ad().unwrap();
    assert_eq!(first.remaining(), None);
    drop(first);
    assert!(matches!(dashboard.timer_state(), TimerState::Watching { .. }));

    let rewarded = second.finished().await.unwrap();
    assert_eq!(rewarded.tokens, 3);
}

#[test_log::test(tokio::test)]
async fn test_teardown_after_grant_keeps_balance_write() {
    let (api, saved) = slow_balance_api(Duration::from_millis(150));
    let base = serve(api);
    let dashboard = dashboard(&base, 2).await;

    let watch = dashboard.watch_ad().unwrap();
    wait_for_tokens(&dashboard, 2).await;
    assert!(saved.lock().unwrap().is_empty());
    watch.cancel();

    tokio::time::sleep(Duration::from_millis(400)).await;
    let saved = saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["address"], ADDRESS);
    assert_eq!(saved[0]["tokenData"]["tokens"], 2);
}

#[test_log::test(tokio::test)]
async fn test_abandoned_wait_cancels_watch() {
    let dashboard = dashboard(DEAD_URL, 50).await;

    let watch = dashboard.watch_ad().unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(30), watch.finished()).await;
    assert!(waited.is_err());

    assert_eq!(dashboard.timer_state(), TimerState::Idle);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(dashboard.balance().await.tokens, 1);
}
