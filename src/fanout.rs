//! Real-time fan-out.
//!
//! Every emergency owns a broadcast scope keyed by its identifier; a
//! separate global scope announces brand-new emergencies to dashboards.
//! Publishing is fire-and-forget: a mutation never waits on subscribers,
//! and parties not subscribed at publish time get nothing (no replay).
//! Subscriptions die with the receiver; terminal emergencies close their
//! scope so late subscribers observe end-of-stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config;
use crate::models::enums::{EmergencyStatus, EmergencyType, Priority, Severity};
use crate::models::{AmbulanceAssignment, ChatMessage, EmergencyLocation, HospitalAssignment};

/// Typed event published on status/assignment/location/chat mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EmergencyEvent {
    NewEmergency {
        emergency_id: String,
        kind: EmergencyType,
        severity: Severity,
        priority: Priority,
        latitude: f64,
        longitude: f64,
        patient_name: String,
    },
    EmergencyStatusUpdated {
        emergency_id: String,
        status: EmergencyStatus,
        updated_by: Uuid,
        timestamp: DateTime<Utc>,
    },
    AmbulanceAssigned {
        emergency_id: String,
        ambulance: AmbulanceAssignment,
        assigned_by: Uuid,
    },
    HospitalAssigned {
        emergency_id: String,
        hospital: HospitalAssignment,
        assigned_by: Uuid,
    },
    LocationUpdated {
        emergency_id: String,
        location: EmergencyLocation,
    },
    NewChatMessage {
        emergency_id: String,
        message: ChatMessage,
    },
    EmergencyCancelled {
        emergency_id: String,
        cancelled_by: Uuid,
    },
}

impl EmergencyEvent {
    pub fn emergency_id(&self) -> &str {
        match self {
            Self::NewEmergency { emergency_id, .. }
            | Self::EmergencyStatusUpdated { emergency_id, .. }
            | Self::AmbulanceAssigned { emergency_id, .. }
            | Self::HospitalAssigned { emergency_id, .. }
            | Self::LocationUpdated { emergency_id, .. }
            | Self::NewChatMessage { emergency_id, .. }
            | Self::EmergencyCancelled { emergency_id, .. } => emergency_id,
        }
    }
}

/// Publish/subscribe broker: one global topic plus per-emergency topics
/// created on first subscribe. Cheap to clone.
#[derive(Clone)]
pub struct EventBroker {
    global: broadcast::Sender<EmergencyEvent>,
    scopes: Arc<Mutex<HashMap<String, broadcast::Sender<EmergencyEvent>>>>,
}

impl EventBroker {
    pub fn new() -> Self {
        let (global, _) = broadcast::channel(config::EVENT_CHANNEL_CAPACITY);
        Self {
            global,
            scopes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to the unscoped feed announcing new emergencies.
    pub fn subscribe_global(&self) -> broadcast::Receiver<EmergencyEvent> {
        self.global.subscribe()
    }

    /// Subscribe to one emergency's scope, creating it on demand.
    pub fn subscribe(&self, emergency_id: &str) -> broadcast::Receiver<EmergencyEvent> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes
            .entry(emergency_id.to_string())
            .or_insert_with(|| broadcast::channel(config::EVENT_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget publish to the global feed.
    pub fn publish_global(&self, event: EmergencyEvent) {
        // Send only fails when nobody is listening, which is fine.
        let _ = self.global.send(event);
    }

    /// Fire-and-forget publish to one emergency's scope. A scope nobody
    /// ever subscribed to does not exist and the event is dropped: no
    /// delivery is owed to parties that were not subscribed at publish
    /// time.
    pub fn publish(&self, emergency_id: &str, event: EmergencyEvent) {
        let sender = {
            let scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
            scopes.get(emergency_id).cloned()
        };
        if let Some(sender) = sender {
            let _ = sender.send(event);
        }
    }

    /// Drop a scope once its emergency reaches a terminal status. Live
    /// receivers observe a closed channel after draining.
    pub fn close_scope(&self, emergency_id: &str) {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        if scopes.remove(emergency_id).is_some() {
            tracing::debug!(emergency_id, "fan-out scope closed");
        }
    }

    /// Number of live per-emergency scopes.
    pub fn scope_count(&self) -> usize {
        self.scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn status_event(id: &str) -> EmergencyEvent {
        EmergencyEvent::EmergencyStatusUpdated {
            emergency_id: id.into(),
            status: EmergencyStatus::Assigned,
            updated_by: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn scoped_subscriber_receives_published_event() {
        let broker = EventBroker::new();
        let mut rx = broker.subscribe("EMG-1-AAAAA");

        broker.publish("EMG-1-AAAAA", status_event("EMG-1-AAAAA"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.emergency_id(), "EMG-1-AAAAA");
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let broker = EventBroker::new();
        let mut other = broker.subscribe("EMG-2-BBBBB");

        broker.subscribe("EMG-1-AAAAA");
        broker.publish("EMG-1-AAAAA", status_event("EMG-1-AAAAA"));

        assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn no_replay_for_late_subscribers() {
        let broker = EventBroker::new();
        // First subscriber creates the scope, then the event is published.
        let _early = broker.subscribe("EMG-1-AAAAA");
        broker.publish("EMG-1-AAAAA", status_event("EMG-1-AAAAA"));

        let mut late = broker.subscribe("EMG-1-AAAAA");
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let broker = EventBroker::new();
        // Nothing subscribed; must not panic or create a scope.
        broker.publish("EMG-9-ZZZZZ", status_event("EMG-9-ZZZZZ"));
        assert_eq!(broker.scope_count(), 0);
    }

    #[tokio::test]
    async fn global_feed_is_independent_of_scopes() {
        let broker = EventBroker::new();
        let mut global = broker.subscribe_global();
        let mut scoped = broker.subscribe("EMG-1-AAAAA");

        broker.publish_global(EmergencyEvent::NewEmergency {
            emergency_id: "EMG-1-AAAAA".into(),
            kind: EmergencyType::Cardiac,
            severity: Severity::Critical,
            priority: Priority::Immediate,
            latitude: 0.0,
            longitude: 0.0,
            patient_name: "P".into(),
        });

        assert!(matches!(
            global.recv().await.unwrap(),
            EmergencyEvent::NewEmergency { .. }
        ));
        assert!(matches!(scoped.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn closing_a_scope_ends_the_stream() {
        let broker = EventBroker::new();
        let mut rx = broker.subscribe("EMG-1-AAAAA");

        broker.publish("EMG-1-AAAAA", status_event("EMG-1-AAAAA"));
        broker.close_scope("EMG-1-AAAAA");

        // Buffered event still drains, then the channel reports closed.
        assert!(rx.recv().await.is_ok());
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
        assert_eq!(broker.scope_count(), 0);
    }

    #[test]
    fn events_serialize_with_kebab_case_tags() {
        let json = serde_json::to_value(status_event("EMG-1-AAAAA")).unwrap();
        assert_eq!(json["type"], "emergency-status-updated");
        assert_eq!(json["status"], "assigned");

        let cancelled = EmergencyEvent::EmergencyCancelled {
            emergency_id: "EMG-1-AAAAA".into(),
            cancelled_by: Uuid::nil(),
        };
        let json = serde_json::to_value(cancelled).unwrap();
        assert_eq!(json["type"], "emergency-cancelled");
    }
}
