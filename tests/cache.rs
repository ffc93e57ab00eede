mod common;

use std::sync::Arc;
use std::time::Duration;

use common::FakeProvider;
use serde_json::json;
use walletwatch::cache::TtlCache;
use walletwatch::provider::{CachePolicy, CachedProvider, WalletDataProvider};
use walletwatch::scheduler::spawn_periodic;

#[tokio::test(start_paused = true)]
async fn one_second_ttl_expires_and_zero_ttl_persists() {
    let cache = TtlCache::new();
    cache.set("k", json!({"v": 1}), 1);
    cache.set("forever", json!("x"), 0);
    assert_eq!(cache.get("k"), Some(json!({"v": 1})));

    tokio::time::advance(Duration::from_millis(1_001)).await;
    assert_eq!(cache.get("k"), None);
    assert!(!cache.has("k"));

    tokio::time::advance(Duration::from_secs(86_400)).await;
    assert_eq!(cache.get("forever"), Some(json!("x")));
}

#[tokio::test(start_paused = true)]
async fn background_sweep_evicts_unread_entries() {
    let cache = TtlCache::new();
    cache.set("short", json!(1), 10);
    cache.set("long", json!(2), 1_000);

    let sweeper = spawn_periodic(Arc::new(cache.clone()), Duration::from_secs(300)).unwrap();

    tokio::time::sleep(Duration::from_secs(299)).await;
    // expired but not yet swept
    assert_eq!(cache.stats().keys, vec!["long".to_string(), "short".to_string()]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.stats().keys, vec!["long".to_string()]);

    sweeper.stop().await;
}

#[tokio::test]
async fn consumers_share_one_cache_instance() {
    let fake = Arc::new(FakeProvider::new());
    fake.set_price("ETH", 3_200.0);

    let cache = TtlCache::new();
    let scoring = CachedProvider::new(fake.clone(), cache.clone(), CachePolicy::default());
    let alerts = CachedProvider::new(fake.clone(), cache.clone(), CachePolicy::default());

    let a = scoring.get_token_price("eth").await.unwrap();
    let b = alerts.get_token_price("ETH").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(fake.calls(), 1);

    cache.clear();
    alerts.get_token_price("ETH").await.unwrap();
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn transaction_pages_are_cached_separately() {
    let fake = Arc::new(FakeProvider::new());
    let cache = TtlCache::new();
    let provider = CachedProvider::new(fake.clone(), cache.clone(), CachePolicy::default());

    provider.get_transactions("0xAbc", 1, 0).await.unwrap();
    provider.get_transactions("0xabc", 10, 0).await.unwrap();
    provider.get_transactions("0xabc", 1, 0).await.unwrap();

    assert_eq!(fake.calls(), 2);
    assert_eq!(cache.stats().keys, vec!["txs:0xabc:10:0".to_string(), "txs:0xabc:1:0".to_string()]);
}
