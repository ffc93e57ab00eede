//! Portfolio and transaction risk scoring

pub mod classification;
pub mod risk_assessor;
pub mod transaction_risk;

pub use classification::{ClassificationTables, TokenClass};
pub use risk_assessor::{
    FactorScore, FactorStatus, PortfolioFactors, PortfolioMetrics, RiskAssessment, RiskEngine,
    RiskLevel,
};
pub use transaction_risk::{TransactionRiskAssessment, TransactionRiskFactor};
