//! In-memory key/value cache with per-key time-to-live.
//!
//! [`TtlCache`] is a cheap handle over shared state: clone it and hand the
//! clone to every collaborator that needs caching, so they all see the same
//! entries. Values are stored as JSON so a single instance can memoize
//! balances, prices and transactions side by side.
//!
//! Expiry uses [`tokio::time::Instant`], which follows the paused test clock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::scheduler::PeriodicTask;
use crate::utils::error::Result;

/// Stored value together with its absolute expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    /// `None` means the entry never expires
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Create an entry; a non-positive `ttl_seconds` never expires, nor does
    /// one too large to represent as an instant
    pub fn new(value: Value, ttl_seconds: i64, now: Instant) -> Self {
        let expires_at = u64::try_from(ttl_seconds)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(|secs| now.checked_add(Duration::from_secs(secs)));
        Self { value, expires_at }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}

/// Diagnostics snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// Shared TTL cache
#[derive(Debug, Clone, Default)]
pub struct TtlCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key`, replacing any previous value and TTL
    pub fn set(&self, key: &str, value: Value, ttl_seconds: i64) {
        let entry = CacheEntry::new(value, ttl_seconds, Instant::now());
        self.write().insert(key.to_string(), entry);
    }

    /// Fetch a live value. An expired entry is evicted and reported as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        {
            let entries = self.read();
            match entries.get(key) {
                | Some(entry) if !entry.is_expired_at(now) => {
                    counter!("walletwatch_cache_hits_total", 1);
                    return Some(entry.value.clone());
                }
                | Some(_) => {}
                | None => {
                    counter!("walletwatch_cache_misses_total", 1);
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, a concurrent set may have refreshed it
        let mut entries = self.write();
        match entries.get(key) {
            | Some(entry) if !entry.is_expired_at(now) => Some(entry.value.clone()),
            | Some(_) => {
                entries.remove(key);
                counter!("walletwatch_cache_evictions_total", 1);
                counter!("walletwatch_cache_misses_total", 1);
                None
            }
            | None => None,
        }
    }

    /// Liveness check with the same semantics as [`TtlCache::get`]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove one entry. Removing a missing key is a no-op.
    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Entry count and key list. Expired-but-unswept keys are included.
    pub fn stats(&self) -> CacheStats {
        let entries = self.read();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheStats { size: entries.len(), keys }
    }

    /// Evict every expired entry, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let evicted = before - entries.len();
        if evicted > 0 {
            counter!("walletwatch_cache_evictions_total", evicted as u64);
        }
        evicted
    }

    /// Typed read; fails only if the stored JSON does not match `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            | Some(value) => Ok(Some(serde_json::from_value(value)?)),
            | None => Ok(None),
        }
    }

    /// Typed write through `serde_json`
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: i64) -> Result<()> {
        let json = serde_json::to_value(value)?;
        self.set(key, json, ttl_seconds);
        Ok(())
    }
}

#[async_trait]
impl PeriodicTask for TtlCache {
    fn name(&self) -> &str {
        "cache-sweep"
    }

    async fn run_once(&self) -> Result<()> {
        let evicted = self.sweep();
        if evicted > 0 {
            log::debug!("cache sweep evicted {} expired entries", evicted);
        }
        Ok(())
    }
}
