use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::prelude::ToPrimitive;
use tracing::instrument;

use super::registry::AlertRegistry;
use super::types::{
    Alert, AlertRule, BalanceCondition, PriceCondition, RetriggerPolicy, RiskCondition,
    TransactionCondition,
};
use crate::analysis::RiskEngine;
use crate::provider::WalletDataProvider;
use crate::scheduler::PeriodicTask;
use crate::utils::error::{Error, Result};

/// Outcome counts of one evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub checked: usize,
    pub triggered: usize,
    pub failed: usize,
    pub rearmed: usize,
}

/// Result of checking one alert against current data
#[derive(Debug, Default)]
struct Check {
    /// `Some` when the condition holds
    message: Option<String>,
    /// Newest transaction timestamp the check looked at
    seen_tx: Option<DateTime<Utc>>,
}

impl Check {
    fn hit(message: Option<String>) -> Self {
        Self { message, seen_tx: None }
    }
}

/// Periodically checks every pending alert against live data.
///
/// Registry locks are only held between provider calls, never across them, so
/// alert CRUD stays responsive while a pass is running.
pub struct AlertEvaluator {
    registry: AlertRegistry,
    provider: Arc<dyn WalletDataProvider>,
    engine: RiskEngine,
    policy: RetriggerPolicy,
}

impl AlertEvaluator {
    pub fn new(registry: AlertRegistry, provider: Arc<dyn WalletDataProvider>, engine: RiskEngine) -> Self {
        Self { registry, provider, engine, policy: RetriggerPolicy::default() }
    }

    pub fn with_policy(mut self, policy: RetriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &AlertRegistry {
        &self.registry
    }

    /// Run one pass over all ACTIVE alerts (and TRIGGERED ones under [`RetriggerPolicy::Rearm`]).
    ///
    /// A failing alert is logged and counted; it never aborts the pass.
    #[instrument(skip(self), name = "alert_evaluation")]
    pub async fn evaluate_all(&self) -> EvaluationReport {
        let started = Instant::now();
        let mut report = EvaluationReport::default();

        // snapshot first so alerts re-armed below wait for the next pass
        let pending = self.registry.pending_alerts().await;

        if self.policy == RetriggerPolicy::Rearm {
            for alert in self.registry.triggered_alerts().await {
                let checked_at = Utc::now();
                match self.check_condition(&alert).await {
                    | Ok(check) => {
                        self.observe(&alert, &check).await;
                        if check.message.is_none() && self.registry.rearm(&alert.id, checked_at).await {
                            report.rearmed += 1;
                            log::info!("alert {} re-armed", alert.id);
                        }
                    }
                    | Err(e) => {
                        report.failed += 1;
                        counter!("walletwatch_alert_failures_total", 1);
                        log::warn!("alert {} re-arm check failed: {}", alert.id, e);
                    }
                }
            }
        }

        for alert in pending {
            let checked_at = Utc::now();
            report.checked += 1;
            counter!("walletwatch_alerts_evaluated_total", 1);

            match self.check_condition(&alert).await {
                | Ok(check) => {
                    self.observe(&alert, &check).await;
                    match check.message {
                        | Some(message) => {
                            if let Some(note) = self.registry.mark_triggered(&alert.id, checked_at, message).await {
                                report.triggered += 1;
                                counter!("walletwatch_alerts_triggered_total", 1);
                                log::info!("alert {} triggered for {}: {}", note.alert_id, note.address, note.message);
                            }
                        }
                        | None => self.registry.mark_checked(&alert.id, checked_at).await,
                    }
                }
                | Err(e) => {
                    report.failed += 1;
                    counter!("walletwatch_alert_failures_total", 1);
                    log::warn!("alert {} ({}) evaluation failed: {}", alert.id, alert.alert_type(), e);
                }
            }
        }

        histogram!("walletwatch_evaluation_pass_ms", started.elapsed().as_secs_f64() * 1_000.0);
        log::debug!(
            "evaluation pass: {} checked, {} triggered, {} failed, {} rearmed",
            report.checked,
            report.triggered,
            report.failed,
            report.rearmed
        );
        report
    }

    async fn observe(&self, alert: &Alert, check: &Check) {
        if let Some(seen) = check.seen_tx {
            self.registry.observe_transaction(&alert.id, seen).await;
        }
    }

    async fn check_condition(&self, alert: &Alert) -> Result<Check> {
        match &alert.rule {
            | AlertRule::Price { token, condition } => {
                let price = self.provider.get_token_price(token).await?;
                let hit = match *condition {
                    | PriceCondition::Above(v) if price.current > v => {
                        Some(format!("{} price {} is above {}", token, price.current, v))
                    }
                    | PriceCondition::Below(v) if price.current < v => {
                        Some(format!("{} price {} is below {}", token, price.current, v))
                    }
                    | PriceCondition::ChangeUp(v) if price.change_24h >= v => {
                        Some(format!("{} is up {:.2}% in 24h (threshold {}%)", token, price.change_24h, v))
                    }
                    | PriceCondition::ChangeDown(v) if price.change_24h <= -v => {
                        Some(format!("{} is down {:.2}% in 24h (threshold {}%)", token, price.change_24h.abs(), v))
                    }
                    | _ => None,
                };
                Ok(Check::hit(hit))
            }
            | AlertRule::Risk { condition } => {
                let holdings = self.provider.get_token_balances(&alert.address).await?;
                let assessment = self.engine.calculate_portfolio_risk(&holdings)?;
                let score = f64::from(assessment.score);
                let hit = match *condition {
                    | RiskCondition::Exceeds(v) if score > v => {
                        Some(format!("portfolio risk score {} exceeds {}", assessment.score, v))
                    }
                    | RiskCondition::Below(v) if score < v => {
                        Some(format!("portfolio risk score {} is below {}", assessment.score, v))
                    }
                    | RiskCondition::Level(level) if assessment.level == level => {
                        Some(format!("portfolio risk level is {} (score {})", level, assessment.score))
                    }
                    | _ => None,
                };
                Ok(Check::hit(hit))
            }
            | AlertRule::Balance { token, condition } => {
                let holdings = self.provider.get_token_balances(&alert.address).await?;
                let holding = match holdings.iter().find(|h| h.normalized_symbol() == *token) {
                    | Some(h) => h,
                    | None => return Ok(Check::default()),
                };
                let balance = holding
                    .balance
                    .to_f64()
                    .ok_or_else(|| Error::DataError(format!("{} balance out of range", token)))?;
                let hit = match *condition {
                    | BalanceCondition::Above(v) if balance > v => {
                        Some(format!("{} balance {} is above {}", token, holding.balance, v))
                    }
                    | BalanceCondition::Below(v) if balance < v => {
                        Some(format!("{} balance {} is below {}", token, holding.balance, v))
                    }
                    | _ => None,
                };
                Ok(Check::hit(hit))
            }
            | AlertRule::Transaction { condition: TransactionCondition::Suspicious } => {
                // The list may come from a cache, so "new" is judged against
                // the newest timestamp already seen, not against wall-clock time.
                let latest = self.provider.get_transactions(&alert.address, 1, 0).await?;
                let tx = match latest.first() {
                    | Some(tx) if tx.timestamp > alert.watermark() => tx,
                    | _ => return Ok(Check::default()),
                };
                let assessment = self.engine.assess_transaction_risk(tx)?;
                let message = assessment.should_alert.then(|| {
                    let reasons: Vec<&str> = assessment.factors.iter().map(|f| f.name.as_str()).collect();
                    format!(
                        "suspicious transaction {} ({} risk, score {}: {})",
                        tx.hash,
                        assessment.level,
                        assessment.score,
                        reasons.join(", ")
                    )
                });
                Ok(Check { message, seen_tx: Some(tx.timestamp) })
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for AlertEvaluator {
    fn name(&self) -> &str {
        "alert-evaluator"
    }

    async fn run_once(&self) -> Result<()> {
        self.evaluate_all().await;
        Ok(())
    }
}
