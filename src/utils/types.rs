//! Common types used throughout the wallet monitoring system.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single token position held by a wallet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub symbol: String,
    /// Token units held, in the token's own denomination
    #[serde(default)]
    pub balance: Decimal,
    /// Position value in USD
    #[serde(rename = "valueUSD", alias = "valueUsd")]
    pub value_usd: f64,
}

impl TokenHolding {
    /// Create a new holding
    pub fn new(symbol: &str, balance: Decimal, value_usd: f64) -> Self {
        Self { symbol: symbol.to_string(), balance, value_usd }
    }

    /// Symbol normalised for classification lookups
    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }
}

/// A token movement carried inside a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub token: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub amount: Decimal,
}

/// An on-chain transaction as reported by the data provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Native value moved, in USD-equivalent units as reported by the provider
    pub value: f64,
    pub gas_used: u64,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
    pub timestamp: DateTime<Utc>,
}

/// Spot price snapshot for a token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub current: f64,
    /// 24h change in percent (e.g. -4.2 for a 4.2% drop)
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default, rename = "volume24h")]
    pub volume_24h: f64,
}
