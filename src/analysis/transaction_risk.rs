//! Additive point scoring for a single transaction.

use serde::{Deserialize, Serialize};

use super::classification::ClassificationTables;
use super::risk_assessor::RiskLevel;
use crate::utils::error::{Error, Result};
use crate::utils::types::Transaction;

pub const HIGH_VALUE_THRESHOLD: f64 = 10_000.0;
pub const HIGH_GAS_THRESHOLD: u64 = 500_000;
pub const MAX_TRANSFERS: usize = 5;

const HIGH_VALUE_POINTS: u32 = 15;
const HIGH_GAS_POINTS: u32 = 20;
const MANY_TRANSFERS_POINTS: u32 = 10;
const UNKNOWN_CONTRACT_POINTS: u32 = 25;

/// One rule that fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRiskFactor {
    pub name: String,
    pub points: u32,
    pub detail: String,
}

/// Result of scoring one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRiskAssessment {
    pub hash: String,
    /// Points clamped to 0-100
    pub score: u32,
    pub level: RiskLevel,
    pub should_alert: bool,
    pub factors: Vec<TransactionRiskFactor>,
}

pub(crate) fn assess(tables: &ClassificationTables, tx: &Transaction) -> Result<TransactionRiskAssessment> {
    if !tx.value.is_finite() || tx.value < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "transaction {} has invalid value {}",
            tx.hash, tx.value
        )));
    }

    let mut factors = Vec::new();
    if tx.value > HIGH_VALUE_THRESHOLD {
        factors.push(TransactionRiskFactor {
            name: "high_value".to_string(),
            points: HIGH_VALUE_POINTS,
            detail: format!("high transaction value ({:.2})", tx.value),
        });
    }
    if tx.gas_used > HIGH_GAS_THRESHOLD {
        // honeypot contracts tend to burn unusual amounts of gas
        factors.push(TransactionRiskFactor {
            name: "high_gas".to_string(),
            points: HIGH_GAS_POINTS,
            detail: format!("unusually high gas usage ({})", tx.gas_used),
        });
    }
    if tx.token_transfers.len() > MAX_TRANSFERS {
        factors.push(TransactionRiskFactor {
            name: "many_transfers".to_string(),
            points: MANY_TRANSFERS_POINTS,
            detail: format!("{} token transfers in one transaction", tx.token_transfers.len()),
        });
    }
    if !tables.is_safe_contract(&tx.to) {
        factors.push(TransactionRiskFactor {
            name: "unknown_contract".to_string(),
            points: UNKNOWN_CONTRACT_POINTS,
            detail: format!("destination {} is not a known contract", tx.to),
        });
    }

    let raw: u32 = factors.iter().map(|f| f.points).sum();
    let score = raw.min(100);
    let level = RiskLevel::from_score(score);

    Ok(TransactionRiskAssessment {
        hash: tx.hash.clone(),
        score,
        level,
        should_alert: level.is_alarming(),
        factors,
    })
}
