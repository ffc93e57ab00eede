//! Symbol and contract classification tables used by risk scoring.
//!
//! Scores are only meaningful together with the tables that produced them, so
//! the tables carry a version string that is stamped onto every assessment.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::utils::types::TokenHolding;

/// Version of the built-in tables and scoring thresholds
pub const DEFAULT_TABLES_VERSION: &str = "2024.06-1";

/// Default value below which a holding counts as illiquid (USD)
pub const DEFAULT_ILLIQUID_FLOOR_USD: f64 = 100.0;

const STABLECOINS: &[&str] = &["USDT", "USDC", "DAI", "BUSD", "TUSD", "USDP", "FRAX", "PYUSD", "USDE"];
const BLUECHIPS: &[&str] = &["BTC", "ETH", "WBTC", "WETH", "BNB", "SOL"];
const MEMECOINS: &[&str] = &["DOGE", "SHIB", "PEPE", "FLOKI", "BONK", "WIF", "BABYDOGE", "ELON"];
const LIQUID_TOKENS: &[&str] = &[
    "BTC", "ETH", "WBTC", "WETH", "USDT", "USDC", "DAI", "BNB", "SOL", "MATIC", "LINK", "UNI",
    "AAVE", "ARB", "OP", "AVAX", "DOGE", "SHIB",
];
// Lowercase EVM addresses of routers and token contracts considered safe destinations
const SAFE_CONTRACTS: &[&str] = &[
    "0x7a250d5630b4cf539739df2c5dacb4c659f2488d", // Uniswap V2 router
    "0xe592427a0aece92de3edee1f18e0157c05861564", // Uniswap V3 router
    "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45", // Uniswap V3 router 2
    "0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad", // Uniswap universal router
    "0x1111111254eeb25477b68fb85ed929f73a960582", // 1inch v5
    "0xdef1c0ded9bec7f1a1670819833240f027b25eff", // 0x exchange proxy
    "0xd9e1ce17f2641f24ae83637ab66a2cca9c378b9f", // SushiSwap router
    "0xdac17f958d2ee523a2206206994597c13d831ec7", // USDT
    "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", // USDC
    "0x6b175474e89094c44da98b954eedeac495271d0f", // DAI
    "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", // WETH
];

/// Volatility bucket of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Stablecoin,
    Bluechip,
    Altcoin,
    Memecoin,
}

impl TokenClass {
    /// Weight applied to the token's share of the portfolio
    pub fn volatility_weight(self) -> f64 {
        match self {
            | TokenClass::Stablecoin => 0.05,
            | TokenClass::Bluechip => 0.15,
            | TokenClass::Altcoin => 0.30,
            | TokenClass::Memecoin => 0.50,
        }
    }
}

/// Versioned classification tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationTables {
    pub version: String,
    pub stablecoins: BTreeSet<String>,
    pub bluechips: BTreeSet<String>,
    pub memecoins: BTreeSet<String>,
    pub liquid_tokens: BTreeSet<String>,
    pub safe_contracts: BTreeSet<String>,
    pub illiquid_floor_usd: f64,
}

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self {
            version: DEFAULT_TABLES_VERSION.to_string(),
            stablecoins: to_set(STABLECOINS),
            bluechips: to_set(BLUECHIPS),
            memecoins: to_set(MEMECOINS),
            liquid_tokens: to_set(LIQUID_TOKENS),
            safe_contracts: to_set(SAFE_CONTRACTS),
            illiquid_floor_usd: DEFAULT_ILLIQUID_FLOOR_USD,
        }
    }
}

impl ClassificationTables {
    /// Override the illiquid floor. Changing a threshold changes the version.
    pub fn with_illiquid_floor(mut self, floor_usd: f64) -> Self {
        if (floor_usd - self.illiquid_floor_usd).abs() > f64::EPSILON {
            self.version = format!("{}+floor{}", self.version, floor_usd);
            self.illiquid_floor_usd = floor_usd;
        }
        self
    }

    /// Classify by uppercased symbol; anything unknown is an altcoin
    pub fn classify(&self, symbol: &str) -> TokenClass {
        let symbol = symbol.trim().to_uppercase();
        if self.stablecoins.contains(&symbol) {
            TokenClass::Stablecoin
        } else if self.bluechips.contains(&symbol) {
            TokenClass::Bluechip
        } else if self.memecoins.contains(&symbol) {
            TokenClass::Memecoin
        } else {
            TokenClass::Altcoin
        }
    }

    /// A holding is illiquid when it is worth less than the floor or is not a known-liquid token
    pub fn is_illiquid(&self, holding: &TokenHolding) -> bool {
        holding.value_usd < self.illiquid_floor_usd
            || !self.liquid_tokens.contains(&holding.normalized_symbol())
    }

    /// Case-insensitive allowlist check for transaction destinations
    pub fn is_safe_contract(&self, address: &str) -> bool {
        self.safe_contracts.contains(&address.trim().to_lowercase())
    }
}
