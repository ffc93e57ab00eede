//! In-memory provider shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use walletwatch::provider::WalletDataProvider;
use walletwatch::utils::types::{TokenHolding, TokenPrice, Transaction};
use walletwatch::{Error, Result};

#[derive(Default)]
pub struct FakeProvider {
    prices: Mutex<HashMap<String, TokenPrice>>,
    balances: Mutex<HashMap<String, Vec<TokenHolding>>>,
    transactions: Mutex<HashMap<String, Vec<Transaction>>>,
    broken_symbols: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, current: f64) {
        self.set_price_change(symbol, current, 0.0);
    }

    pub fn set_price_change(&self, symbol: &str, current: f64, change_24h: f64) {
        let price = TokenPrice { current, change_24h, market_cap: 0.0, volume_24h: 0.0 };
        self.prices.lock().unwrap().insert(symbol.to_uppercase(), price);
    }

    pub fn break_symbol(&self, symbol: &str) {
        self.broken_symbols.lock().unwrap().insert(symbol.to_uppercase());
    }

    pub fn set_balances(&self, address: &str, holdings: Vec<TokenHolding>) {
        self.balances.lock().unwrap().insert(address.to_lowercase(), holdings);
    }

    pub fn push_transaction(&self, address: &str, tx: Transaction) {
        // newest first
        self.transactions.lock().unwrap().entry(address.to_lowercase()).or_default().insert(0, tx);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletDataProvider for FakeProvider {
    async fn get_token_balances(&self, address: &str) -> Result<Vec<TokenHolding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balances.lock().unwrap().get(&address.to_lowercase()).cloned().unwrap_or_default())
    }

    async fn get_transactions(&self, address: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let all = self.transactions.lock().unwrap().get(&address.to_lowercase()).cloned().unwrap_or_default();
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_token_price(&self, symbol: &str) -> Result<TokenPrice> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let symbol = symbol.to_uppercase();
        if self.broken_symbols.lock().unwrap().contains(&symbol) {
            return Err(Error::ConnectionError(format!("price feed for {} unavailable", symbol)));
        }
        self.prices
            .lock()
            .unwrap()
            .get(&symbol)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("price for {}", symbol)))
    }
}
