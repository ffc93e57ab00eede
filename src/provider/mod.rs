//! Wallet and market data sources.
//!
//! [`WalletDataProvider`] is the capability set the risk engine and alert
//! evaluator consume. [`CachedProvider`] memoizes any provider through the
//! shared [`TtlCache`](crate::cache::TtlCache); [`HttpDataProvider`] talks to a
//! REST data API.

pub mod cached;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::utils::error::Result;
use crate::utils::types::{TokenHolding, TokenPrice, Transaction};

pub use cached::{CachePolicy, CachedProvider};
pub use http::HttpDataProvider;

/// Source of balances, transactions and prices for a wallet address
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletDataProvider: Send + Sync {
    /// Current token holdings of `address`
    async fn get_token_balances(&self, address: &str) -> Result<Vec<TokenHolding>>;

    /// Transactions of `address`, newest first
    async fn get_transactions(&self, address: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>>;

    /// Spot price and 24h change for `symbol`
    async fn get_token_price(&self, symbol: &str) -> Result<TokenPrice>;
}

#[async_trait]
impl<T: WalletDataProvider + ?Sized> WalletDataProvider for Arc<T> {
    async fn get_token_balances(&self, address: &str) -> Result<Vec<TokenHolding>> {
        (**self).get_token_balances(address).await
    }

    async fn get_transactions(&self, address: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>> {
        (**self).get_transactions(address, limit, offset).await
    }

    async fn get_token_price(&self, symbol: &str) -> Result<TokenPrice> {
        (**self).get_token_price(symbol).await
    }
}
