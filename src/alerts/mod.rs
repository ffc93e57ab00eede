//! Alert rules for wallets and the periodic evaluator that fires them.
//!
//! An alert starts ACTIVE. Each evaluation pass checks every ACTIVE alert
//! against fresh provider data; when its condition holds the alert moves to
//! TRIGGERED, a notification is recorded, and it is not checked again unless
//! the evaluator runs with [`RetriggerPolicy::Rearm`].

pub mod evaluator;
pub mod registry;
pub mod types;

pub use evaluator::{AlertEvaluator, EvaluationReport};
pub use registry::{AlertRegistry, DEFAULT_MAX_NOTIFICATIONS};
pub use types::{
    Alert, AlertNotification, AlertRequest, AlertRule, AlertStatus, AlertType, BalanceCondition,
    PriceCondition, RetriggerPolicy, RiskCondition, Severity, TransactionCondition,
};
