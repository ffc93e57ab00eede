mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::FakeProvider;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use walletwatch::alerts::{AlertEvaluator, AlertRegistry, AlertRequest, AlertStatus, RetriggerPolicy, Severity};
use walletwatch::analysis::RiskEngine;
use walletwatch::cache::TtlCache;
use walletwatch::provider::{CachePolicy, CachedProvider};
use walletwatch::scheduler::spawn_periodic;
use walletwatch::utils::types::{TokenHolding, Transaction};

const WALLET: &str = "0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2";

fn setup(policy: RetriggerPolicy) -> (Arc<FakeProvider>, AlertEvaluator) {
    let provider = Arc::new(FakeProvider::new());
    let evaluator = AlertEvaluator::new(AlertRegistry::new(), provider.clone(), RiskEngine::new()).with_policy(policy);
    (provider, evaluator)
}

fn aura_above(threshold: f64) -> AlertRequest {
    AlertRequest::new(WALLET, "PRICE", "ABOVE", threshold).with_token("AURA")
}

#[tokio::test]
async fn price_above_triggers_only_when_strictly_greater() {
    let (provider, evaluator) = setup(RetriggerPolicy::Never);
    let alert = evaluator.registry().create_alert(aura_above(1.5)).await.unwrap();
    assert_eq!(alert.status, AlertStatus::Active);
    assert!(!alert.is_triggered());

    provider.set_price("AURA", 1.5);
    evaluator.evaluate_all().await;
    assert!(evaluator.registry().get_active_alerts(WALLET).await.is_empty());

    provider.set_price("AURA", 1.51);
    let report = evaluator.evaluate_all().await;
    assert_eq!(report.triggered, 1);

    let triggered = evaluator.registry().get_active_alerts(&WALLET.to_lowercase()).await;
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].id, alert.id);
    assert!(triggered[0].is_triggered());
}

#[tokio::test]
async fn triggered_alert_is_not_reset_when_condition_clears() {
    let (provider, evaluator) = setup(RetriggerPolicy::Never);
    let alert = evaluator.registry().create_alert(aura_above(1.5)).await.unwrap();

    provider.set_price("AURA", 2.0);
    evaluator.evaluate_all().await;

    provider.set_price("AURA", 1.0);
    for _ in 0..3 {
        evaluator.evaluate_all().await;
    }

    let stored = evaluator.registry().get_alert(&alert.id).await.unwrap();
    assert!(stored.is_triggered());
    assert_eq!(evaluator.registry().get_notifications(WALLET).await.len(), 1);
}

#[tokio::test]
async fn rearm_policy_lets_an_alert_fire_again() {
    let (provider, evaluator) = setup(RetriggerPolicy::Rearm);
    evaluator.registry().create_alert(aura_above(1.5)).await.unwrap();

    provider.set_price("AURA", 2.0);
    evaluator.evaluate_all().await;
    provider.set_price("AURA", 1.0);
    let report = evaluator.evaluate_all().await;
    assert_eq!(report.rearmed, 1);
    assert!(evaluator.registry().get_active_alerts(WALLET).await.is_empty());

    provider.set_price("AURA", 2.5);
    evaluator.evaluate_all().await;
    assert_eq!(evaluator.registry().get_notifications(WALLET).await.len(), 2);
}

#[tokio::test]
async fn one_failing_alert_does_not_block_the_pass() {
    let (provider, evaluator) = setup(RetriggerPolicy::Never);
    provider.break_symbol("RUG");
    provider.set_price("AURA", 3.0);

    let broken = evaluator
        .registry()
        .create_alert(AlertRequest::new(WALLET, "PRICE", "ABOVE", 1).with_token("RUG"))
        .await
        .unwrap();
    // no price published at all for this one
    evaluator
        .registry()
        .create_alert(AlertRequest::new(WALLET, "PRICE", "BELOW", 1).with_token("GHOST"))
        .await
        .unwrap();
    let healthy = evaluator.registry().create_alert(aura_above(1.5)).await.unwrap();

    let report = evaluator.evaluate_all().await;
    assert_eq!(report.checked, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.triggered, 1);

    assert!(evaluator.registry().get_alert(&healthy.id).await.unwrap().is_triggered());
    assert_eq!(evaluator.registry().get_alert(&broken.id).await.unwrap().status, AlertStatus::Active);
}

#[tokio::test]
async fn risk_and_balance_alerts_read_wallet_holdings() {
    let (provider, evaluator) = setup(RetriggerPolicy::Never);
    provider.set_balances(
        WALLET,
        vec![TokenHolding::new("PEPE", dec!(1_000_000), 900.0), TokenHolding::new("USDC", dec!(50), 50.0)],
    );

    let registry = evaluator.registry();
    registry.create_alert(AlertRequest::new(WALLET, "RISK", "LEVEL", "CRITICAL")).await.unwrap();
    registry
        .create_alert(AlertRequest::new(WALLET, "BALANCE", "BELOW", 100).with_token("usdc"))
        .await
        .unwrap();
    registry
        .create_alert(AlertRequest::new(WALLET, "BALANCE", "ABOVE", 1).with_token("ETH"))
        .await
        .unwrap();

    let report = evaluator.evaluate_all().await;
    assert_eq!(report.checked, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.triggered, 2);

    let notes = registry.get_notifications(WALLET).await;
    assert!(notes.iter().any(|n| n.severity == Severity::High && n.message.contains("CRITICAL")));
    assert!(notes.iter().any(|n| n.severity == Severity::Medium && n.message.contains("USDC")));
}

fn transfer_heavy_tx(hash: &str, at: chrono::DateTime<Utc>) -> Transaction {
    let json = serde_json::json!({
        "hash": hash,
        "from": WALLET,
        "to": "0x00000000000000000000000000000000deadbeef",
        "value": 25_000.0,
        "gasUsed": 650_000,
        "tokenTransfers": [],
        "timestamp": at.to_rfc3339(),
    });
    serde_json::from_value(json).unwrap()
}

#[tokio::test]
async fn transaction_alert_fires_on_new_suspicious_transaction() {
    let (provider, evaluator) = setup(RetriggerPolicy::Never);
    provider.push_transaction(WALLET, transfer_heavy_tx("0xold", Utc::now() - chrono::Duration::minutes(10)));

    let alert = evaluator
        .registry()
        .create_alert(AlertRequest::new(WALLET, "TRANSACTION", "SUSPICIOUS", 1))
        .await
        .unwrap();

    let report = evaluator.evaluate_all().await;
    assert_eq!(report.triggered, 0);

    provider.push_transaction(WALLET, transfer_heavy_tx("0xnew", Utc::now() + chrono::Duration::seconds(2)));
    let report = evaluator.evaluate_all().await;
    assert_eq!(report.triggered, 1);

    let notes = evaluator.registry().get_notifications(WALLET).await;
    assert_eq!(notes[0].alert_id, alert.id);
    assert_eq!(notes[0].severity, Severity::High);
    assert!(notes[0].message.contains("0xnew"));
}

#[tokio::test]
async fn notifications_reach_subscriber_and_deleted_alerts_are_skipped() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let provider = Arc::new(FakeProvider::new());
    let registry = AlertRegistry::new().with_notifier(tx);
    let evaluator = AlertEvaluator::new(registry.clone(), provider.clone(), RiskEngine::new());

    provider.set_price("AURA", 2.0);
    let kept = registry.create_alert(aura_above(1.5)).await.unwrap();
    let removed = registry.create_alert(aura_above(1.0)).await.unwrap();
    assert!(registry.delete_alert(&removed.id).await);

    let report = evaluator.evaluate_all().await;
    assert_eq!(report.checked, 1);

    let note = rx.recv().await.unwrap();
    assert_eq!(note.alert_id, kept.id);
    assert!(rx.try_recv().is_err());
    assert_eq!(registry.get_alerts_by_address(WALLET).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduled_evaluator_uses_shared_cache() {
    let fake = Arc::new(FakeProvider::new());
    fake.set_price("AURA", 1.0);

    let cache = TtlCache::new();
    let policy = CachePolicy { price_ttl_secs: 45, ..CachePolicy::default() };
    let provider = Arc::new(CachedProvider::new(fake.clone(), cache.clone(), policy));

    let registry = AlertRegistry::new();
    registry.create_alert(aura_above(1.5)).await.unwrap();
    let evaluator = AlertEvaluator::new(registry.clone(), provider, RiskEngine::new());
    let handle = spawn_periodic(Arc::new(evaluator), Duration::from_secs(30)).unwrap();

    // first pass at t=30s fetches and caches the price
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(fake.calls(), 1);
    assert!(cache.has("price:AURA"));

    // the price moves, but the cached value is still served at t=60s
    fake.set_price("AURA", 2.0);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.calls(), 1);
    assert!(registry.get_active_alerts(WALLET).await.is_empty());

    // entry expired at t=75s, the t=90s pass refetches and triggers
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.calls(), 2);
    assert_eq!(registry.get_active_alerts(WALLET).await.len(), 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn transaction_landing_behind_a_cached_list_still_fires() {
    let fake = Arc::new(FakeProvider::new());
    let policy = CachePolicy { transactions_ttl_secs: 60, ..CachePolicy::default() };
    let provider = Arc::new(CachedProvider::new(fake.clone(), TtlCache::new(), policy));
    let evaluator = AlertEvaluator::new(AlertRegistry::new(), provider, RiskEngine::new());

    let alert = evaluator
        .registry()
        .create_alert(AlertRequest::new(WALLET, "TRANSACTION", "SUSPICIOUS", 1))
        .await
        .unwrap();
    assert_eq!(evaluator.evaluate_all().await.triggered, 0);

    // lands while the empty list is still cached
    fake.push_transaction(WALLET, transfer_heavy_tx("0xlate", alert.created_at + chrono::Duration::milliseconds(1)));
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(evaluator.evaluate_all().await.triggered, 0);

    tokio::time::advance(Duration::from_secs(61)).await;
    let report = evaluator.evaluate_all().await;
    assert_eq!(report.triggered, 1);
    let notes = evaluator.registry().get_notifications(WALLET).await;
    assert!(notes[0].message.contains("0xlate"));
}
