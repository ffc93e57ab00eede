//! Read-through caching decorator for any [`WalletDataProvider`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::WalletDataProvider;
use crate::cache::TtlCache;
use crate::utils::error::Result;
use crate::utils::types::{TokenHolding, TokenPrice, Transaction};

/// Per-kind TTLs in seconds (non-positive disables expiry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub balances_ttl_secs: i64,
    pub transactions_ttl_secs: i64,
    pub price_ttl_secs: i64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { balances_ttl_secs: 60, transactions_ttl_secs: 30, price_ttl_secs: 30 }
    }
}

/// Wraps a provider and memoizes its answers in a shared cache
pub struct CachedProvider<P> {
    inner: P,
    cache: TtlCache,
    policy: CachePolicy,
}

impl<P: WalletDataProvider> CachedProvider<P> {
    /// `cache` must be the process-wide instance so every consumer shares hits
    pub fn new(inner: P, cache: TtlCache, policy: CachePolicy) -> Self {
        Self { inner, cache, policy }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn balances_key(address: &str) -> String {
        format!("wallet:{}", address.to_lowercase())
    }

    pub fn transactions_key(address: &str, limit: usize, offset: usize) -> String {
        format!("txs:{}:{}:{}", address.to_lowercase(), limit, offset)
    }

    pub fn price_key(symbol: &str) -> String {
        format!("price:{}", symbol.to_uppercase())
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get_as::<T>(key) {
            | Ok(hit) => hit,
            | Err(e) => {
                // Shape changed under the same key; drop it and refetch
                log::warn!("discarding unreadable cache entry {}: {}", key, e);
                self.cache.delete(key);
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T, ttl: i64) {
        if let Err(e) = self.cache.set_as(key, value, ttl) {
            log::warn!("failed to cache {}: {}", key, e);
        }
    }
}

#[async_trait]
impl<P: WalletDataProvider> WalletDataProvider for CachedProvider<P> {
    async fn get_token_balances(&self, address: &str) -> Result<Vec<TokenHolding>> {
        let key = Self::balances_key(address);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let fresh = self.inner.get_token_balances(address).await?;
        self.store(&key, &fresh, self.policy.balances_ttl_secs);
        Ok(fresh)
    }

    async fn get_transactions(&self, address: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>> {
        let key = Self::transactions_key(address, limit, offset);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let fresh = self.inner.get_transactions(address, limit, offset).await?;
        self.store(&key, &fresh, self.policy.transactions_ttl_secs);
        Ok(fresh)
    }

    async fn get_token_price(&self, symbol: &str) -> Result<TokenPrice> {
        let key = Self::price_key(symbol);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let fresh = self.inner.get_token_price(symbol).await?;
        self.store(&key, &fresh, self.policy.price_ttl_secs);
        Ok(fresh)
    }
}
