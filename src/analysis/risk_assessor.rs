use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::classification::{ClassificationTables, TokenClass};
use super::transaction_risk::{self, TransactionRiskAssessment};
use crate::utils::error::{Error, Result};
use crate::utils::types::{TokenHolding, Transaction};

pub const MAX_DIVERSIFICATION: f64 = 25.0;
pub const MAX_VOLATILITY: f64 = 30.0;
pub const MAX_CONCENTRATION: f64 = 25.0;
pub const MAX_LIQUIDITY: f64 = 20.0;

/// Categorical risk level, a step function of a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a score onto the shared thresholds
    pub fn from_score(score: u32) -> Self {
        match score {
            | s if s >= 75 => RiskLevel::Critical,
            | s if s >= 50 => RiskLevel::High,
            | s if s >= 25 => RiskLevel::Medium,
            | _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            | RiskLevel::Low => "LOW",
            | RiskLevel::Medium => "MEDIUM",
            | RiskLevel::High => "HIGH",
            | RiskLevel::Critical => "CRITICAL",
        }
    }

    /// HIGH and CRITICAL warrant notifying the user
    pub fn is_alarming(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            | "LOW" => Ok(RiskLevel::Low),
            | "MEDIUM" => Ok(RiskLevel::Medium),
            | "HIGH" => Ok(RiskLevel::High),
            | "CRITICAL" => Ok(RiskLevel::Critical),
            | other => Err(Error::InvalidArgument(format!("unknown risk level '{}'", other))),
        }
    }
}

/// How worrying a single sub-factor is relative to its own ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Healthy,
    Moderate,
    Elevated,
    Severe,
}

impl FactorStatus {
    fn from_share(score: f64, max: f64) -> Self {
        let share = if max > 0.0 { score / max } else { 0.0 };
        match share {
            | s if s >= 0.75 => FactorStatus::Severe,
            | s if s >= 0.5 => FactorStatus::Elevated,
            | s if s >= 0.25 => FactorStatus::Moderate,
            | _ => FactorStatus::Healthy,
        }
    }
}

/// Score, status and explanation of one sub-factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub score: f64,
    pub max: f64,
    pub status: FactorStatus,
    pub detail: String,
}

impl FactorScore {
    fn new(score: f64, max: f64, detail: String) -> Self {
        Self { score, max, status: FactorStatus::from_share(score, max), detail }
    }
}

/// The four portfolio sub-factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioFactors {
    pub diversification: FactorScore,
    pub volatility: FactorScore,
    pub concentration: FactorScore,
    pub liquidity: FactorScore,
}

impl PortfolioFactors {
    /// Unrounded sum of the sub-scores
    pub fn total(&self) -> f64 {
        self.diversification.score
            + self.volatility.score
            + self.concentration.score
            + self.liquidity.score
    }
}

/// Raw portfolio measurements the factors were derived from (percentages are 0-100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub token_count: usize,
    pub total_value_usd: f64,
    pub top1_percent: f64,
    pub top3_percent: f64,
    pub stablecoin_percent: f64,
    pub memecoin_percent: f64,
    pub illiquid_percent: f64,
}

/// Portfolio risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0-100, higher is riskier
    pub score: u8,
    pub level: RiskLevel,
    pub factors: PortfolioFactors,
    pub metrics: PortfolioMetrics,
    pub recommendations: Vec<String>,
    /// Version of the classification tables used
    pub model_version: String,
}

/// Stateless scoring over a fixed set of classification tables
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    tables: ClassificationTables,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: ClassificationTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    /// Score a set of holdings
    pub fn calculate_portfolio_risk(&self, tokens: &[TokenHolding]) -> Result<RiskAssessment> {
        validate_holdings(tokens)?;

        if tokens.is_empty() {
            return Ok(self.empty_assessment());
        }

        let metrics = self.measure(tokens);
        let factors = PortfolioFactors {
            diversification: diversification_factor(&metrics),
            volatility: self.volatility_factor(tokens, &metrics),
            concentration: concentration_factor(&metrics),
            liquidity: liquidity_factor(&metrics),
        };

        let score = factors.total().round().clamp(0.0, 100.0) as u8;
        let level = RiskLevel::from_score(score as u32);
        let recommendations = recommendations(&metrics, level);

        Ok(RiskAssessment {
            score,
            level,
            factors,
            metrics,
            recommendations,
            model_version: self.tables.version.clone(),
        })
    }

    /// Score a single transaction
    pub fn assess_transaction_risk(&self, tx: &Transaction) -> Result<TransactionRiskAssessment> {
        transaction_risk::assess(&self.tables, tx)
    }

    fn empty_assessment(&self) -> RiskAssessment {
        let zero = |max: f64, detail: &str| FactorScore::new(0.0, max, detail.to_string());
        RiskAssessment {
            score: 0,
            level: RiskLevel::Low,
            factors: PortfolioFactors {
                diversification: zero(MAX_DIVERSIFICATION, "no tokens held"),
                volatility: zero(MAX_VOLATILITY, "no tokens held"),
                concentration: zero(MAX_CONCENTRATION, "no tokens held"),
                liquidity: zero(MAX_LIQUIDITY, "no tokens held"),
            },
            metrics: PortfolioMetrics::default(),
            recommendations: vec!["Wallet holds no tokens; add holdings to receive a risk profile".to_string()],
            model_version: self.tables.version.clone(),
        }
    }

    fn measure(&self, tokens: &[TokenHolding]) -> PortfolioMetrics {
        let total: f64 = tokens.iter().map(|t| t.value_usd).sum();

        let mut values: Vec<f64> = tokens.iter().map(|t| t.value_usd).collect();
        values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        let share = |value: f64| if total > 0.0 { value / total * 100.0 } else { 0.0 };
        let class_share = |class: TokenClass| {
            share(
                tokens
                    .iter()
                    .filter(|t| self.tables.classify(&t.symbol) == class)
                    .map(|t| t.value_usd)
                    .sum(),
            )
        };
        let illiquid_value: f64 =
            tokens.iter().filter(|t| self.tables.is_illiquid(t)).map(|t| t.value_usd).sum();

        PortfolioMetrics {
            token_count: tokens.len(),
            total_value_usd: total,
            top1_percent: share(values.first().copied().unwrap_or(0.0)),
            top3_percent: share(values.iter().take(3).sum()),
            stablecoin_percent: class_share(TokenClass::Stablecoin),
            memecoin_percent: class_share(TokenClass::Memecoin),
            illiquid_percent: share(illiquid_value),
        }
    }

    fn volatility_factor(&self, tokens: &[TokenHolding], metrics: &PortfolioMetrics) -> FactorScore {
        if metrics.total_value_usd <= 0.0 {
            return FactorScore::new(0.0, MAX_VOLATILITY, "portfolio has no value".to_string());
        }

        // Weighted sum lives on a 0-100 scale before rescaling into the band
        let weighted: f64 = tokens
            .iter()
            .map(|t| {
                let pct = t.value_usd / metrics.total_value_usd * 100.0;
                pct * self.tables.classify(&t.symbol).volatility_weight()
            })
            .sum();
        let score = (weighted / 100.0 * MAX_VOLATILITY).clamp(0.0, MAX_VOLATILITY);

        FactorScore::new(
            score,
            MAX_VOLATILITY,
            format!(
                "weighted volatility {:.1}% ({:.1}% memecoins, {:.1}% stablecoins)",
                weighted, metrics.memecoin_percent, metrics.stablecoin_percent
            ),
        )
    }
}

fn validate_holdings(tokens: &[TokenHolding]) -> Result<()> {
    for (idx, token) in tokens.iter().enumerate() {
        if token.symbol.trim().is_empty() {
            return Err(Error::InvalidArgument(format!("token #{} has an empty symbol", idx)));
        }
        if !token.value_usd.is_finite() || token.value_usd < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "token {} has invalid valueUSD {}",
                token.symbol, token.value_usd
            )));
        }
    }
    Ok(())
}

fn diversification_factor(metrics: &PortfolioMetrics) -> FactorScore {
    let score = match metrics.token_count {
        | 0 => 0.0,
        | 1 => 25.0,
        | 2 => 20.0,
        | 3..=5 => 12.0,
        | 6..=10 => 5.0,
        | _ => 2.0,
    };
    let plural = if metrics.token_count == 1 { "" } else { "s" };
    FactorScore::new(score, MAX_DIVERSIFICATION, format!("{} token{} held", metrics.token_count, plural))
}

fn concentration_factor(metrics: &PortfolioMetrics) -> FactorScore {
    let score = if metrics.top1_percent > 70.0 {
        25.0
    } else if metrics.top1_percent > 50.0 {
        20.0
    } else if metrics.top1_percent > 30.0 {
        15.0
    } else if metrics.top3_percent > 80.0 {
        10.0
    } else {
        3.0
    };
    FactorScore::new(
        score,
        MAX_CONCENTRATION,
        format!(
            "largest holding {:.1}% of value, top 3 {:.1}%",
            metrics.top1_percent, metrics.top3_percent
        ),
    )
}

fn liquidity_factor(metrics: &PortfolioMetrics) -> FactorScore {
    if metrics.total_value_usd <= 0.0 {
        return FactorScore::new(0.0, MAX_LIQUIDITY, "portfolio has no value".to_string());
    }
    let score = if metrics.illiquid_percent > 50.0 {
        20.0
    } else if metrics.illiquid_percent > 25.0 {
        15.0
    } else if metrics.illiquid_percent > 10.0 {
        8.0
    } else {
        2.0
    };
    FactorScore::new(
        score,
        MAX_LIQUIDITY,
        format!("{:.1}% of value in illiquid tokens", metrics.illiquid_percent),
    )
}

fn recommendations(metrics: &PortfolioMetrics, level: RiskLevel) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.token_count < 3 {
        out.push("Diversify across at least 3 tokens to reduce single-asset exposure".to_string());
    }
    if metrics.memecoin_percent > 30.0 {
        out.push(format!(
            "Memecoins make up {:.1}% of the portfolio; consider trimming speculative positions",
            metrics.memecoin_percent
        ));
    }
    if metrics.top1_percent > 50.0 {
        out.push(format!(
            "Largest holding is {:.1}% of value; rebalance to limit concentration",
            metrics.top1_percent
        ));
    }
    if metrics.illiquid_percent > 25.0 {
        out.push(format!(
            "{:.1}% of value sits in illiquid tokens that may be hard to exit",
            metrics.illiquid_percent
        ));
    }
    if metrics.stablecoin_percent < 10.0 && level != RiskLevel::Low {
        out.push("Hold at least 10% in stablecoins as a volatility buffer".to_string());
    }
    if out.is_empty() {
        out.push("Portfolio is well balanced; keep monitoring".to_string());
    }
    out
}
