use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::types::{Alert, AlertNotification, AlertRequest, AlertRule, AlertStatus};
use crate::utils::error::Result;

pub const DEFAULT_MAX_NOTIFICATIONS: usize = 1000;

#[derive(Debug, Default)]
struct AlertStore {
    alerts: HashMap<String, Alert>,
    /// lowercase address -> alert ids in creation order
    by_address: HashMap<String, Vec<String>>,
    /// lowercase address -> triggered alert ids in trigger order
    triggered: HashMap<String, Vec<String>>,
    notifications: VecDeque<AlertNotification>,
}

impl AlertStore {
    fn collect(&self, ids: Option<&Vec<String>>) -> Vec<Alert> {
        ids.map(|ids| ids.iter().filter_map(|id| self.alerts.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn unindex(map: &mut HashMap<String, Vec<String>>, address: &str, id: &str) {
        if let Some(ids) = map.get_mut(address) {
            ids.retain(|i| i != id);
            if ids.is_empty() {
                map.remove(address);
            }
        }
    }
}

/// In-memory store of alert rules keyed by id and by owning address.
///
/// Cloning yields another handle onto the same store.
#[derive(Debug, Clone)]
pub struct AlertRegistry {
    store: Arc<RwLock<AlertStore>>,
    max_notifications: usize,
    notifier: Option<mpsc::UnboundedSender<AlertNotification>>,
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_NOTIFICATIONS)
    }

    /// `max_notifications` bounds the in-memory notification log (oldest dropped first)
    pub fn with_capacity(max_notifications: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(AlertStore::default())),
            max_notifications: max_notifications.max(1),
            notifier: None,
        }
    }

    /// Forward every notification to `tx` in addition to the in-memory log
    pub fn with_notifier(mut self, tx: mpsc::UnboundedSender<AlertNotification>) -> Self {
        self.notifier = Some(tx);
        self
    }

    /// Validate `request` and store a new ACTIVE alert
    pub async fn create_alert(&self, request: AlertRequest) -> Result<Alert> {
        let (address, rule) = request.into_rule()?;
        Ok(self.insert(address, rule).await)
    }

    /// Create a batch of alerts; nothing is stored unless every request is valid
    pub async fn create_alerts(&self, requests: Vec<AlertRequest>) -> Result<Vec<Alert>> {
        let rules = requests
            .into_iter()
            .map(AlertRequest::into_rule)
            .collect::<Result<Vec<_>>>()?;
        let mut created = Vec::with_capacity(rules.len());
        for (address, rule) in rules {
            created.push(self.insert(address, rule).await);
        }
        Ok(created)
    }

    async fn insert(&self, address: String, rule: AlertRule) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            address,
            rule,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            triggered_at: None,
            last_checked: None,
            last_seen_tx: None,
        };

        let mut store = self.store.write().await;
        store
            .by_address
            .entry(alert.address.to_lowercase())
            .or_default()
            .push(alert.id.clone());
        store.alerts.insert(alert.id.clone(), alert.clone());
        drop(store);

        log::info!("created {} alert {} for {}", alert.alert_type(), alert.id, alert.address);
        alert
    }

    pub async fn get_alert(&self, id: &str) -> Option<Alert> {
        self.store.read().await.alerts.get(id).cloned()
    }

    /// Every alert registered for `address` regardless of status
    pub async fn get_alerts_by_address(&self, address: &str) -> Vec<Alert> {
        let store = self.store.read().await;
        store.collect(store.by_address.get(&address.to_lowercase()))
    }

    /// Alerts of `address` that have fired, in trigger order
    pub async fn get_active_alerts(&self, address: &str) -> Vec<Alert> {
        let store = self.store.read().await;
        store.collect(store.triggered.get(&address.to_lowercase()))
    }

    /// Remove an alert from every index. Returns false if the id is unknown.
    pub async fn delete_alert(&self, id: &str) -> bool {
        let mut store = self.store.write().await;
        let alert = match store.alerts.remove(id) {
            | Some(alert) => alert,
            | None => return false,
        };
        let key = alert.address.to_lowercase();
        AlertStore::unindex(&mut store.by_address, &key, id);
        AlertStore::unindex(&mut store.triggered, &key, id);
        log::info!("deleted alert {}", id);
        true
    }

    /// Snapshot of alerts still waiting for their condition
    pub async fn pending_alerts(&self) -> Vec<Alert> {
        self.with_status(AlertStatus::Active).await
    }

    /// Snapshot of alerts that have fired
    pub async fn triggered_alerts(&self) -> Vec<Alert> {
        self.with_status(AlertStatus::Triggered).await
    }

    async fn with_status(&self, status: AlertStatus) -> Vec<Alert> {
        let store = self.store.read().await;
        let mut alerts: Vec<Alert> = store.alerts.values().filter(|a| a.status == status).cloned().collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    pub async fn alert_count(&self) -> usize {
        self.store.read().await.alerts.len()
    }

    /// Notifications recorded for `address`, oldest first
    pub async fn get_notifications(&self, address: &str) -> Vec<AlertNotification> {
        let store = self.store.read().await;
        store
            .notifications
            .iter()
            .filter(|n| n.address.eq_ignore_ascii_case(address))
            .cloned()
            .collect()
    }

    pub async fn recent_notifications(&self, limit: usize) -> Vec<AlertNotification> {
        let store = self.store.read().await;
        let skip = store.notifications.len().saturating_sub(limit);
        store.notifications.iter().skip(skip).cloned().collect()
    }

    pub(crate) async fn mark_checked(&self, id: &str, at: DateTime<Utc>) {
        if let Some(alert) = self.store.write().await.alerts.get_mut(id) {
            alert.last_checked = Some(at);
        }
    }

    /// Advance the transaction watermark; never moves it backwards
    pub(crate) async fn observe_transaction(&self, id: &str, seen: DateTime<Utc>) {
        if let Some(alert) = self.store.write().await.alerts.get_mut(id) {
            if alert.last_seen_tx.map_or(true, |prev| seen > prev) {
                alert.last_seen_tx = Some(seen);
            }
        }
    }

    /// Move an ACTIVE alert to TRIGGERED and record its notification.
    ///
    /// Returns `None` when the alert was deleted or already triggered since it
    /// was read.
    pub(crate) async fn mark_triggered(
        &self,
        id: &str,
        at: DateTime<Utc>,
        message: String,
    ) -> Option<AlertNotification> {
        let mut store = self.store.write().await;
        let alert = store.alerts.get_mut(id)?;
        if alert.status != AlertStatus::Active {
            return None;
        }
        alert.status = AlertStatus::Triggered;
        alert.triggered_at = Some(at);
        alert.last_checked = Some(at);

        let notification = AlertNotification {
            alert_id: alert.id.clone(),
            address: alert.address.clone(),
            message,
            severity: alert.rule.severity(),
            timestamp: at,
        };
        let key = alert.address.to_lowercase();

        store.triggered.entry(key).or_default().push(id.to_string());
        store.notifications.push_back(notification.clone());
        while store.notifications.len() > self.max_notifications {
            store.notifications.pop_front();
        }
        drop(store);

        if let Some(tx) = &self.notifier {
            if tx.send(notification.clone()).is_err() {
                log::debug!("notification subscriber dropped; alert {} only logged", id);
            }
        }
        Some(notification)
    }

    /// Return a TRIGGERED alert to ACTIVE
    pub(crate) async fn rearm(&self, id: &str, at: DateTime<Utc>) -> bool {
        let mut store = self.store.write().await;
        let key = match store.alerts.get_mut(id) {
            | Some(alert) if alert.status == AlertStatus::Triggered => {
                alert.status = AlertStatus::Active;
                alert.triggered_at = None;
                alert.last_checked = Some(at);
                alert.address.to_lowercase()
            }
            | _ => return false,
        };
        AlertStore::unindex(&mut store.triggered, &key, id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::types::Severity;
    use assert_matches::assert_matches;
    use crate::utils::error::Error;

    fn price_request(address: &str) -> AlertRequest {
        AlertRequest::new(address, "PRICE", "ABOVE", 1.5).with_token("AURA")
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_address() {
        let registry = AlertRegistry::new();
        let alert = registry.create_alert(price_request("0xAbC")).await.unwrap();

        assert_eq!(alert.status, AlertStatus::Active);
        assert!(!alert.is_triggered());
        assert!(alert.triggered_at.is_none());

        let found = registry.get_alerts_by_address("0xabc").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, alert.id);
        assert!(registry.get_active_alerts("0xABC").await.is_empty());
        assert!(registry.get_alerts_by_address("0xdef").await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_stores_nothing() {
        let registry = AlertRegistry::new();
        let err = registry.create_alert(AlertRequest::new("0x1", "PRICE", "ABOVE", 1)).await.unwrap_err();
        assert_matches!(err, Error::ValidationError(_));
        assert_eq!(registry.alert_count().await, 0);
    }

    #[tokio::test]
    async fn test_batch_create_is_all_or_nothing() {
        let registry = AlertRegistry::new();
        let bad = AlertRequest::new("0x2", "BALANCE", "BELOW", 10);
        let err = registry.create_alerts(vec![price_request("0x1"), bad]).await.unwrap_err();
        assert_matches!(err, Error::ValidationError(msg) if msg.contains("token"));
        assert_eq!(registry.alert_count().await, 0);

        let created = registry
            .create_alerts(vec![price_request("0x1"), AlertRequest::new("0x2", "RISK", "EXCEEDS", 70)])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(registry.pending_alerts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = AlertRegistry::new();
        let a = registry.create_alert(price_request("0x1")).await.unwrap();
        let b = registry.create_alert(price_request("0x1")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(registry.get_alerts_by_address("0x1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_trigger_moves_alert_and_records_notification() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = AlertRegistry::new().with_notifier(tx);
        let alert = registry.create_alert(price_request("0xAbC")).await.unwrap();

        let note = registry.mark_triggered(&alert.id, Utc::now(), "AURA above".into()).await.unwrap();
        assert_eq!(note.severity, Severity::Medium);
        assert_eq!(rx.recv().await.unwrap(), note);

        // second trigger is a no-op
        assert!(registry.mark_triggered(&alert.id, Utc::now(), "again".into()).await.is_none());

        let active = registry.get_active_alerts("0xabc").await;
        assert_eq!(active.len(), 1);
        assert!(active[0].is_triggered());
        assert!(registry.pending_alerts().await.is_empty());
        assert_eq!(registry.get_notifications("0xABC").await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_from_all_indexes() {
        let registry = AlertRegistry::new();
        let alert = registry.create_alert(price_request("0x1")).await.unwrap();
        registry.mark_triggered(&alert.id, Utc::now(), "fired".into()).await;

        assert!(registry.delete_alert(&alert.id).await);
        assert!(!registry.delete_alert(&alert.id).await);
        assert!(registry.get_alert(&alert.id).await.is_none());
        assert!(registry.get_alerts_by_address("0x1").await.is_empty());
        assert!(registry.get_active_alerts("0x1").await.is_empty());
        assert!(registry.mark_triggered(&alert.id, Utc::now(), "late".into()).await.is_none());
    }

    #[tokio::test]
    async fn test_rearm_returns_alert_to_pending() {
        let registry = AlertRegistry::new();
        let alert = registry.create_alert(price_request("0x1")).await.unwrap();
        assert!(!registry.rearm(&alert.id, Utc::now()).await);

        registry.mark_triggered(&alert.id, Utc::now(), "fired".into()).await;
        assert!(registry.rearm(&alert.id, Utc::now()).await);

        let stored = registry.get_alert(&alert.id).await.unwrap();
        assert_eq!(stored.status, AlertStatus::Active);
        assert!(stored.triggered_at.is_none());
        assert!(registry.get_active_alerts("0x1").await.is_empty());
        assert_eq!(registry.pending_alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_watermark_only_moves_forward() {
        let registry = AlertRegistry::new();
        let alert = registry
            .create_alert(AlertRequest::new("0x1", "TRANSACTION", "SUSPICIOUS", true))
            .await
            .unwrap();
        assert_eq!(alert.watermark(), alert.created_at);

        let later = alert.created_at + chrono::Duration::minutes(5);
        registry.observe_transaction(&alert.id, later).await;
        registry.observe_transaction(&alert.id, later - chrono::Duration::minutes(1)).await;

        let stored = registry.get_alert(&alert.id).await.unwrap();
        assert_eq!(stored.last_seen_tx, Some(later));
        assert_eq!(stored.watermark(), later);
    }

    #[tokio::test]
    async fn test_notification_log_is_bounded() {
        let registry = AlertRegistry::with_capacity(2);
        for _ in 0..3 {
            let alert = registry.create_alert(price_request("0x1")).await.unwrap();
            registry.mark_triggered(&alert.id, Utc::now(), alert.id.clone()).await;
        }
        let recent = registry.recent_notifications(10).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(registry.recent_notifications(1).await.len(), 1);
    }
}
