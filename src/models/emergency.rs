//! The emergency record: one reported incident with its full lifecycle
//! state, stored as a single self-describing document.
//!
//! Patient details are denormalized into the record at creation time so
//! the record stays readable even if the subject's profile changes later.
//! Timeline, chat and notification entries are append-only sequences owned
//! exclusively by the record; they never outlive it.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    ActorRole, Consciousness, DeliveryStatus, EmergencyStatus, EmergencyType,
    NotificationChannel, Priority, Severity, TimelineEventKind,
};

/// Denormalized snapshot of the reporting patient, captured at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub patient_id: Uuid,
    pub name: String,
    pub age: Option<u32>,
    pub phone: Option<String>,
    pub blood_group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

/// Incident location. Coordinates are required; the address is whatever
/// the reporter could provide. Mutable while the emergency is active
/// (patient or ambulance crew may correct it en route).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyLocation {
    pub address: Option<Address>,
    pub latitude: f64,
    pub longitude: f64,
    /// GPS accuracy in meters
    pub accuracy_meters: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    pub name: String,
    pub severity: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u16>,
    pub temperature_celsius: Option<f32>,
    pub oxygen_saturation: Option<u8>,
    pub respiratory_rate: Option<u16>,
    /// AVPU scale
    pub consciousness: Option<Consciousness>,
}

/// AI triage annotation. Advisory only: never consulted by the status
/// state machine or any authorization check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAnnotation {
    /// 1 (minor) to 10 (life-threatening)
    pub urgency_score: u8,
    pub recommended_priority: Option<Priority>,
    pub suggested_actions: Vec<String>,
    /// 0.0 to 1.0
    pub confidence: f32,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceAssignment {
    pub resource_id: Uuid,
    pub crew_name: String,
    pub crew_phone: Option<String>,
    pub estimated_arrival: DateTime<Utc>,
    pub current_location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAvailability {
    pub general: u32,
    pub icu: u32,
    pub emergency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalAssignment {
    pub resource_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub estimated_travel_minutes: Option<u32>,
    /// Snapshot taken at assignment time, not kept current.
    pub bed_availability: Option<BedAvailability>,
}

/// One immutable audit entry. Appended by the timeline recorder, never
/// mutated or reordered afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
}

/// Durations in whole seconds, derived from timeline milestones.
/// Computed, never written directly by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetrics {
    pub alert_to_assignment_secs: Option<i64>,
    pub assignment_to_arrival_secs: Option<i64>,
    pub total_response_secs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: Uuid,
    pub sender_role: ActorRole,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

/// Bookkeeping for one best-effort external delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub status: DeliveryStatus,
    pub attempted_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

/// Emergency contact notified about this incident, seeded at creation
/// from the subject's registered contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactNotification {
    pub contact_id: Option<Uuid>,
    pub name: String,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub status: DeliveryStatus,
    pub notified_at: Option<DateTime<Utc>>,
}

/// The central entity: one reported incident with classification, subject
/// snapshot, location, clinical detail, assignments, status, timeline,
/// chat and notification bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emergency {
    /// Globally unique, human-readable, immutable after creation.
    pub emergency_id: String,
    pub kind: EmergencyType,
    pub severity: Severity,
    pub priority: Priority,

    pub patient: PatientSnapshot,
    pub location: EmergencyLocation,

    pub symptoms: Vec<Symptom>,
    pub description: String,
    pub additional_notes: Option<String>,
    pub vital_signs: Option<VitalSigns>,
    pub ai_triage: Option<TriageAnnotation>,

    pub assigned_ambulance: Option<AmbulanceAssignment>,
    pub assigned_hospital: Option<HospitalAssignment>,

    /// Single source of truth for the lifecycle stage. Mutated only
    /// through the status state machine.
    pub status: EmergencyStatus,

    pub timeline: Vec<TimelineEvent>,
    pub response_time: ResponseMetrics,
    pub chat_messages: Vec<ChatMessage>,
    pub notifications: Vec<NotificationAttempt>,
    pub contacts_notified: Vec<ContactNotification>,

    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly once, if and only if status is completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set exactly once, if and only if status is cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency token; bumped by every successful save.
    pub version: i64,
}

impl Emergency {
    /// Construct a fresh pending record. Timeline and notification
    /// seeding are the orchestrator's job.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        emergency_id: String,
        kind: EmergencyType,
        severity: Severity,
        priority: Priority,
        patient: PatientSnapshot,
        location: EmergencyLocation,
        description: String,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            emergency_id,
            kind,
            severity,
            priority,
            patient,
            location,
            symptoms: Vec::new(),
            description,
            additional_notes: None,
            vital_signs: None,
            ai_triage: None,
            assigned_ambulance: None,
            assigned_hospital: None,
            status: EmergencyStatus::Pending,
            timeline: Vec::new(),
            response_time: ResponseMetrics::default(),
            chat_messages: Vec::new(),
            notifications: Vec::new(),
            contacts_notified: Vec::new(),
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_urgent(&self) -> bool {
        self.severity == Severity::Critical || self.priority == Priority::Immediate
    }
}

/// Generate an emergency identifier: time-based prefix + random suffix,
/// e.g. `EMG-1754550000000-X7K2Q`.
pub fn generate_emergency_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("EMG-{}-{}", now.timestamp_millis(), suffix)
}
