//! Alert records, typed rules and the raw creation request.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::RiskLevel;
use crate::utils::error::{Error, Result};

/// Alert category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertType {
    Price,
    Risk,
    Balance,
    Transaction,
}

impl FromStr for AlertType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            | "PRICE" => Ok(AlertType::Price),
            | "RISK" => Ok(AlertType::Risk),
            | "BALANCE" => Ok(AlertType::Balance),
            | "TRANSACTION" => Ok(AlertType::Transaction),
            | other => Err(Error::ValidationError(format!("unknown alert type '{}'", other))),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            | AlertType::Price => "PRICE",
            | AlertType::Risk => "RISK",
            | AlertType::Balance => "BALANCE",
            | AlertType::Transaction => "TRANSACTION",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceCondition {
    Above(f64),
    Below(f64),
    /// 24h change in percent at or above the threshold
    ChangeUp(f64),
    /// 24h change in percent at or below the negated threshold
    ChangeDown(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCondition {
    Exceeds(f64),
    Below(f64),
    Level(RiskLevel),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceCondition {
    Above(f64),
    Below(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCondition {
    /// Latest transaction scores HIGH or CRITICAL
    Suspicious,
}

/// What an alert watches, with its condition and threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum AlertRule {
    Price { token: String, condition: PriceCondition },
    Risk { condition: RiskCondition },
    Balance { token: String, condition: BalanceCondition },
    Transaction { condition: TransactionCondition },
}

impl AlertRule {
    pub fn alert_type(&self) -> AlertType {
        match self {
            | AlertRule::Price { .. } => AlertType::Price,
            | AlertRule::Risk { .. } => AlertType::Risk,
            | AlertRule::Balance { .. } => AlertType::Balance,
            | AlertRule::Transaction { .. } => AlertType::Transaction,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            | AlertRule::Price { token, .. } | AlertRule::Balance { token, .. } => Some(token),
            | AlertRule::Risk { .. } | AlertRule::Transaction { .. } => None,
        }
    }

    /// Risk and transaction alerts are the ones that indicate danger to funds
    pub fn severity(&self) -> Severity {
        match self.alert_type() {
            | AlertType::Risk | AlertType::Transaction => Severity::High,
            | AlertType::Price | AlertType::Balance => Severity::Medium,
        }
    }
}

/// Lifecycle state. Deletion removes the alert outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Active,
    Triggered,
}

/// A stored alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub address: String,
    pub rule: AlertRule,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
    /// Timestamp of the newest transaction a TRANSACTION check has looked at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_tx: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_triggered(&self) -> bool {
        self.status == AlertStatus::Triggered
    }

    pub fn alert_type(&self) -> AlertType {
        self.rule.alert_type()
    }

    /// Only transactions strictly newer than this are considered.
    ///
    /// Follows data timestamps rather than the wall clock, so a stale
    /// (cached) transaction list never moves it past unseen transactions.
    pub fn watermark(&self) -> DateTime<Utc> {
        match self.last_seen_tx {
            | Some(seen) => seen.max(self.created_at),
            | None => self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
}

/// Record produced when an alert fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    pub alert_id: String,
    pub address: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Whether a triggered alert may return to ACTIVE once its condition clears
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetriggerPolicy {
    /// Triggered alerts stay triggered until deleted
    #[default]
    Never,
    /// Triggered alerts are re-checked and re-armed when the condition no longer holds
    Rearm,
}

/// Raw alert creation request, as decoded from an API payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub condition: Option<String>,
    pub value: Option<Value>,
    pub token: Option<String>,
}

impl AlertRequest {
    pub fn new(address: &str, alert_type: &str, condition: &str, value: impl Into<Value>) -> Self {
        Self {
            address: Some(address.to_string()),
            alert_type: Some(alert_type.to_string()),
            condition: Some(condition.to_string()),
            value: Some(value.into()),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Check required fields and build the typed rule. Returns the trimmed address and rule.
    pub fn into_rule(self) -> Result<(String, AlertRule)> {
        let address = required(self.address, "address")?;
        let alert_type: AlertType = required(self.alert_type, "type")?.parse()?;
        let condition = required(self.condition, "condition")?.to_uppercase();
        let value = match self.value {
            | None | Some(Value::Null) => return Err(missing("value")),
            | Some(v) => v,
        };
        let token = self.token.map(|t| t.trim().to_uppercase()).filter(|t| !t.is_empty());

        let rule = match alert_type {
            | AlertType::Price => {
                let token = token.ok_or_else(|| missing("token"))?;
                let v = number(&value)?;
                let condition = match condition.as_str() {
                    | "ABOVE" => PriceCondition::Above(v),
                    | "BELOW" => PriceCondition::Below(v),
                    | "CHANGE_UP" => PriceCondition::ChangeUp(v),
                    | "CHANGE_DOWN" => PriceCondition::ChangeDown(v),
                    | _ => return Err(bad_condition(alert_type, &condition)),
                };
                AlertRule::Price { token, condition }
            }
            | AlertType::Risk => {
                let condition = match condition.as_str() {
                    | "EXCEEDS" => RiskCondition::Exceeds(number(&value)?),
                    | "BELOW" => RiskCondition::Below(number(&value)?),
                    | "LEVEL" => {
                        let level = value
                            .as_str()
                            .ok_or_else(|| Error::ValidationError("LEVEL value must be a risk level name".into()))?
                            .parse::<RiskLevel>()
                            .map_err(|e| Error::ValidationError(e.to_string()))?;
                        RiskCondition::Level(level)
                    }
                    | _ => return Err(bad_condition(alert_type, &condition)),
                };
                AlertRule::Risk { condition }
            }
            | AlertType::Balance => {
                let token = token.ok_or_else(|| missing("token"))?;
                let v = number(&value)?;
                let condition = match condition.as_str() {
                    | "ABOVE" => BalanceCondition::Above(v),
                    | "BELOW" => BalanceCondition::Below(v),
                    | _ => return Err(bad_condition(alert_type, &condition)),
                };
                AlertRule::Balance { token, condition }
            }
            | AlertType::Transaction => {
                // value is required for every request but carries no threshold here
                let condition = match condition.as_str() {
                    | "SUSPICIOUS" => TransactionCondition::Suspicious,
                    | _ => return Err(bad_condition(alert_type, &condition)),
                };
                AlertRule::Transaction { condition }
            }
        };

        Ok((address, rule))
    }
}

fn missing(field: &str) -> Error {
    Error::ValidationError(format!("{} is required", field))
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).ok_or_else(|| missing(name))
}

fn bad_condition(alert_type: AlertType, condition: &str) -> Error {
    Error::ValidationError(format!("condition '{}' is not valid for {} alerts", condition, alert_type))
}

fn number(value: &Value) -> Result<f64> {
    let parsed = match value {
        | Value::Number(n) => n.as_f64(),
        | Value::String(s) => s.trim().parse::<f64>().ok(),
        | _ => None,
    };
    match parsed {
        | Some(v) if v.is_finite() => Ok(v),
        | _ => Err(Error::ValidationError(format!("value {} is not a finite number", value))),
    }
}
