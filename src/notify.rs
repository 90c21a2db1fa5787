//! Best-effort external notification with retry bookkeeping.
//!
//! Delivery runs asynchronously on blocking tasks and never gates any
//! emergency operation: outcomes are recorded on the record's
//! notification attempts, failures included. A failed attempt retries up
//! to a bound with backoff; exhaustion leaves it `failed` permanently. A
//! record that reached a terminal status gets no further rounds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config;
use crate::db::{DatabaseError, EmergencyStore};
use crate::models::enums::{DeliveryStatus, NotificationChannel};
use crate::models::Emergency;

/// Black-box sender for one delivery attempt. `Err` carries the failure
/// reason for logging; it is recorded, never raised to callers.
pub trait NotificationSender: Send + Sync {
    fn send(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        payload: &str,
    ) -> Result<(), String>;
}

/// POSTs each attempt to an SMS/email/push gateway webhook.
pub struct WebhookSender {
    endpoint: String,
    // Built lazily: the blocking client must not be constructed on the
    // async runtime, and send() only ever runs on the blocking pool.
    client: std::sync::OnceLock<reqwest::blocking::Client>,
}

impl WebhookSender {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: std::sync::OnceLock::new(),
        }
    }

    fn client(&self) -> &reqwest::blocking::Client {
        self.client.get_or_init(reqwest::blocking::Client::new)
    }
}

impl NotificationSender for WebhookSender {
    fn send(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        payload: &str,
    ) -> Result<(), String> {
        let response = self
            .client()
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "channel": channel.as_str(),
                "recipient": recipient,
                "message": payload,
            }))
            .send()
            .map_err(|e| e.to_string())?;
        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Sender used when no gateway is configured. Attempts are still
/// recorded; they end `failed` after the usual retry budget.
pub struct DisabledSender;

impl NotificationSender for DisabledSender {
    fn send(&self, _: NotificationChannel, _: &str, _: &str) -> Result<(), String> {
        Err("no notification gateway configured".into())
    }
}

// ═══════════════════════════════════════════════════════════
// Retry engine
// ═══════════════════════════════════════════════════════════

/// Drives notification rounds for emergencies.
#[derive(Clone)]
pub struct NotificationEngine {
    store: Arc<dyn EmergencyStore>,
    sender: Arc<dyn NotificationSender>,
    max_retries: u32,
    backoff: Duration,
}

impl NotificationEngine {
    pub fn new(store: Arc<dyn EmergencyStore>, sender: Arc<dyn NotificationSender>) -> Self {
        Self::with_policy(store, sender, config::MAX_NOTIFY_RETRIES, config::NOTIFY_RETRY_BACKOFF)
    }

    pub fn with_policy(
        store: Arc<dyn EmergencyStore>,
        sender: Arc<dyn NotificationSender>,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            max_retries,
            backoff,
        }
    }

    /// Kick off delivery rounds for one emergency on a blocking task.
    /// Fire-and-forget from the caller's perspective; the handle is
    /// returned so tests can await completion.
    pub fn dispatch(&self, emergency_id: &str) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let sender = self.sender.clone();
        let id = emergency_id.to_string();
        let max_retries = self.max_retries;
        let backoff = self.backoff;
        tokio::task::spawn_blocking(move || {
            run_rounds(&*store, &*sender, &id, max_retries, backoff)
        })
    }
}

fn alert_payload(record: &Emergency) -> String {
    format!(
        "{} emergency {} reported for {} (severity {}, priority {})",
        record.kind.as_str(),
        record.emergency_id,
        record.patient.name,
        record.severity.as_str(),
        record.priority.as_str(),
    )
}

fn run_rounds(
    store: &dyn EmergencyStore,
    sender: &dyn NotificationSender,
    emergency_id: &str,
    max_retries: u32,
    backoff: Duration,
) {
    loop {
        let record = match store.load(emergency_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(emergency_id, error = %e, "notification round aborted");
                return;
            }
        };
        if record.is_terminal() {
            tracing::debug!(emergency_id, "terminal status, notification rounds stopped");
            return;
        }

        // (index, channel, recipient, retry count this attempt will carry)
        let due: Vec<(usize, NotificationChannel, String, u32)> = record
            .notifications
            .iter()
            .enumerate()
            .filter_map(|(i, att)| match att.status {
                DeliveryStatus::Pending => {
                    Some((i, att.channel, att.recipient.clone(), att.retry_count))
                }
                DeliveryStatus::Failed if att.retry_count < max_retries => {
                    Some((i, att.channel, att.recipient.clone(), att.retry_count + 1))
                }
                _ => None,
            })
            .collect();
        if due.is_empty() {
            return;
        }

        let payload = alert_payload(&record);
        let outcomes: Vec<(usize, DeliveryStatus, u32)> = due
            .into_iter()
            .map(|(i, channel, recipient, retry_count)| {
                match sender.send(channel, &recipient, &payload) {
                    Ok(()) => (i, DeliveryStatus::Delivered, retry_count),
                    Err(reason) => {
                        tracing::warn!(
                            emergency_id,
                            channel = channel.as_str(),
                            recipient = %recipient,
                            retry_count,
                            reason = %reason,
                            "notification delivery failed"
                        );
                        (i, DeliveryStatus::Failed, retry_count)
                    }
                }
            })
            .collect();

        persist_outcomes(store, emergency_id, &outcomes);

        let more_due = outcomes
            .iter()
            .any(|(_, status, retry)| *status == DeliveryStatus::Failed && *retry < max_retries);
        if !more_due {
            return;
        }
        std::thread::sleep(backoff);
    }
}

/// Write the round's outcomes back, retrying on version conflicts with
/// concurrent operations. Attempts are append-only, so positional
/// indices stay valid across the reload.
fn persist_outcomes(
    store: &dyn EmergencyStore,
    emergency_id: &str,
    outcomes: &[(usize, DeliveryStatus, u32)],
) {
    let at = Utc::now();
    for _ in 0..config::MAX_CONFLICT_RETRIES {
        let mut record = match store.load(emergency_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(emergency_id, error = %e, "outcome persistence aborted");
                return;
            }
        };

        for (index, status, retry_count) in outcomes {
            let Some(attempt) = record.notifications.get_mut(*index) else {
                continue;
            };
            attempt.status = *status;
            attempt.retry_count = *retry_count;
            attempt.attempted_at = Some(at);

            let recipient = attempt.recipient.clone();
            for contact in &mut record.contacts_notified {
                if contact.phone.as_deref() == Some(recipient.as_str()) {
                    contact.status = *status;
                    contact.notified_at = Some(at);
                }
            }
        }
        record.updated_at = at;

        match store.save(&mut record) {
            Ok(()) => return,
            Err(DatabaseError::Conflict { .. }) => continue,
            Err(e) => {
                tracing::warn!(emergency_id, error = %e, "failed to persist notification outcomes");
                return;
            }
        }
    }
    tracing::warn!(emergency_id, "conflict retries exhausted persisting notification outcomes");
}
