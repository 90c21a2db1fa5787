//! Emergency coordination service: the public operations, composed from
//! the store, state machine, assignment coordinator, timeline recorder
//! and fan-out broker.
//!
//! Every operation takes an explicit actor and appears atomic per
//! emergency identifier: load, validate, mutate, persist as one logical
//! unit, serialized by the store's optimistic-concurrency check with a
//! bounded reload-and-retry on conflict. Fan-out publication happens
//! after a successful persist and is never waited on; external
//! notification rounds run on their own blocking tasks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::assignment;
use crate::config;
use crate::db::{DatabaseError, EmergencyStore};
use crate::directory::{IdentityDirectory, ResourceDirectory};
use crate::error::CoordinationError;
use crate::fanout::{EmergencyEvent, EventBroker};
use crate::models::enums::{
    ActorRole, DeliveryStatus, EmergencyStatus, EmergencyType, NotificationChannel, Priority,
    Severity, TimelineEventKind,
};
use crate::models::{
    generate_emergency_id, Actor, Address, ChatMessage, ContactNotification, Emergency,
    EmergencyFilter, EmergencyLocation, NotificationAttempt, Symptom, TriageAnnotation,
    VitalSigns,
};
use crate::notify::{NotificationEngine, NotificationSender};
use crate::status;
use crate::timeline;

/// Creation request. The patient defaults to the reporting actor;
/// reporting on behalf of someone else requires the admin role.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmergency {
    pub patient_id: Option<Uuid>,
    pub kind: EmergencyType,
    pub severity: Severity,
    pub priority: Priority,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    pub description: String,
    pub additional_notes: Option<String>,
    pub location: LocationInput,
    pub vital_signs: Option<VitalSigns>,
    pub ai_triage: Option<TriageAnnotation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub address: Option<Address>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

pub struct EmergencyService {
    store: Arc<dyn EmergencyStore>,
    identity: Arc<dyn IdentityDirectory>,
    resources: Arc<dyn ResourceDirectory>,
    broker: EventBroker,
    notifier: NotificationEngine,
}

impl EmergencyService {
    pub fn new(
        store: Arc<dyn EmergencyStore>,
        identity: Arc<dyn IdentityDirectory>,
        resources: Arc<dyn ResourceDirectory>,
        broker: EventBroker,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        let notifier = NotificationEngine::new(store.clone(), sender);
        Self {
            store,
            identity,
            resources,
            broker,
            notifier,
        }
    }

    /// The broker this service publishes on, for subscribing transports.
    pub fn broker(&self) -> &EventBroker {
        &self.broker
    }

    // ── Intake ───────────────────────────────────────────

    /// Validate and persist a new emergency, append its `created` event,
    /// announce it on the global feed and seed emergency-contact
    /// notifications from the subject's registered contacts.
    pub async fn create(
        &self,
        request: CreateEmergency,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        let mut violations = Vec::new();
        if request.description.trim().is_empty() {
            violations.push("description is required".to_string());
        }
        if !(-90.0..=90.0).contains(&request.location.latitude) {
            violations.push("latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&request.location.longitude) {
            violations.push("longitude must be between -180 and 180".to_string());
        }
        if let Some(triage) = &request.ai_triage {
            if !(1..=10).contains(&triage.urgency_score) {
                violations.push("triage urgency score must be between 1 and 10".to_string());
            }
            if !(0.0..=1.0).contains(&triage.confidence) {
                violations.push("triage confidence must be between 0 and 1".to_string());
            }
        }
        if !violations.is_empty() {
            return Err(CoordinationError::Validation(violations));
        }

        let patient_id = request.patient_id.unwrap_or(actor.id);
        if patient_id != actor.id && !actor.is_admin() {
            return Err(CoordinationError::forbidden(
                actor,
                "report an emergency for another patient",
            ));
        }
        let profile = self
            .identity
            .resolve_actor(patient_id)
            .ok_or_else(|| CoordinationError::NotFound(format!("patient {patient_id}")))?;

        let now = Utc::now();
        let mut record = Emergency::new(
            generate_emergency_id(now),
            request.kind,
            request.severity,
            request.priority,
            profile.snapshot(),
            EmergencyLocation {
                address: request.location.address,
                latitude: request.location.latitude,
                longitude: request.location.longitude,
                accuracy_meters: request.location.accuracy_meters,
                recorded_at: now,
            },
            request.description,
            actor.id,
            now,
        );
        record.symptoms = request.symptoms;
        record.additional_notes = request.additional_notes;
        record.vital_signs = request.vital_signs;
        record.ai_triage = request.ai_triage;

        timeline::append(
            &mut record,
            TimelineEventKind::Created,
            "Emergency alert created",
            actor,
            now,
        );

        for contact in &profile.emergency_contacts {
            record.contacts_notified.push(ContactNotification {
                contact_id: contact.contact_id,
                name: contact.name.clone(),
                relationship: contact.relationship.clone(),
                phone: contact.phone.clone(),
                status: DeliveryStatus::Pending,
                notified_at: None,
            });
            if let Some(phone) = &contact.phone {
                record.notifications.push(NotificationAttempt {
                    channel: NotificationChannel::Sms,
                    recipient: phone.clone(),
                    status: DeliveryStatus::Pending,
                    attempted_at: None,
                    retry_count: 0,
                });
            }
        }

        self.store.save(&mut record)?;

        let event = EmergencyEvent::NewEmergency {
            emergency_id: record.emergency_id.clone(),
            kind: record.kind,
            severity: record.severity,
            priority: record.priority,
            latitude: record.location.latitude,
            longitude: record.location.longitude,
            patient_name: record.patient.name.clone(),
        };
        self.broker.publish_global(event.clone());
        self.broker.publish(&record.emergency_id, event);
        let _ = self.notifier.dispatch(&record.emergency_id);

        tracing::info!(
            emergency_id = %record.emergency_id,
            severity = record.severity.as_str(),
            priority = record.priority.as_str(),
            contacts = record.contacts_notified.len(),
            "emergency created"
        );
        Ok(record)
    }

    // ── Mutations ────────────────────────────────────────

    pub async fn update_status(
        &self,
        emergency_id: &str,
        new_status: EmergencyStatus,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        let actor = *actor;
        self.mutate(emergency_id, move |record| {
            status::apply_transition(record, new_status, notes.as_deref(), &actor, Utc::now())?;
            Ok(vec![EmergencyEvent::EmergencyStatusUpdated {
                emergency_id: record.emergency_id.clone(),
                status: record.status,
                updated_by: actor.id,
                timestamp: Utc::now(),
            }])
        })
        .await
    }

    pub async fn assign_ambulance(
        &self,
        emergency_id: &str,
        resource_id: Uuid,
        estimated_arrival: DateTime<Utc>,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        if !assignment::may_assign(actor) {
            return Err(CoordinationError::forbidden(actor, "assign an ambulance"));
        }
        let resource = self
            .resources
            .resolve_resource(resource_id)
            .ok_or_else(|| CoordinationError::NotFound(format!("resource {resource_id}")))?;

        let actor = *actor;
        self.mutate(emergency_id, move |record| {
            assignment::assign_ambulance(record, &resource, estimated_arrival, &actor, Utc::now())?;
            let mut events = Vec::new();
            if let Some(ambulance) = record.assigned_ambulance.clone() {
                events.push(EmergencyEvent::AmbulanceAssigned {
                    emergency_id: record.emergency_id.clone(),
                    ambulance,
                    assigned_by: actor.id,
                });
            }
            Ok(events)
        })
        .await
    }

    pub async fn assign_hospital(
        &self,
        emergency_id: &str,
        resource_id: Uuid,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        if !assignment::may_assign(actor) {
            return Err(CoordinationError::forbidden(actor, "assign a hospital"));
        }
        let resource = self
            .resources
            .resolve_resource(resource_id)
            .ok_or_else(|| CoordinationError::NotFound(format!("resource {resource_id}")))?;

        let actor = *actor;
        self.mutate(emergency_id, move |record| {
            assignment::assign_hospital(record, &resource, &actor, Utc::now())?;
            let mut events = Vec::new();
            if let Some(hospital) = record.assigned_hospital.clone() {
                events.push(EmergencyEvent::HospitalAssigned {
                    emergency_id: record.emergency_id.clone(),
                    hospital,
                    assigned_by: actor.id,
                });
            }
            Ok(events)
        })
        .await
    }

    /// Overwrite the incident coordinates. Allowed for the subject and
    /// for admin/ambulance roles; does not touch status or timeline.
    pub async fn update_location(
        &self,
        emergency_id: &str,
        latitude: f64,
        longitude: f64,
        accuracy_meters: Option<f64>,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        let mut violations = Vec::new();
        if !(-90.0..=90.0).contains(&latitude) {
            violations.push("latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&longitude) {
            violations.push("longitude must be between -180 and 180".to_string());
        }
        if !violations.is_empty() {
            return Err(CoordinationError::Validation(violations));
        }

        let actor = *actor;
        self.mutate(emergency_id, move |record| {
            let authorized = match actor.role {
                ActorRole::Admin | ActorRole::Ambulance => true,
                ActorRole::Patient => record.patient.patient_id == actor.id,
                _ => false,
            };
            if !authorized {
                return Err(CoordinationError::forbidden(
                    &actor,
                    "update the emergency location",
                ));
            }

            record.location.latitude = latitude;
            record.location.longitude = longitude;
            record.location.accuracy_meters = accuracy_meters;
            record.location.recorded_at = Utc::now();
            record.updated_by = Some(actor.id);
            Ok(vec![EmergencyEvent::LocationUpdated {
                emergency_id: record.emergency_id.clone(),
                location: record.location.clone(),
            }])
        })
        .await
    }

    pub async fn post_chat_message(
        &self,
        emergency_id: &str,
        text: String,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        if text.trim().is_empty() {
            return Err(CoordinationError::Validation(vec![
                "message text is required".to_string(),
            ]));
        }

        let actor = *actor;
        self.mutate(emergency_id, move |record| {
            let message = ChatMessage {
                sender_id: actor.id,
                sender_role: actor.role,
                text: text.clone(),
                sent_at: Utc::now(),
                read: false,
            };
            record.chat_messages.push(message.clone());
            record.updated_by = Some(actor.id);
            Ok(vec![EmergencyEvent::NewChatMessage {
                emergency_id: record.emergency_id.clone(),
                message,
            }])
        })
        .await
    }

    /// Cancel the emergency. Narrower authorization than a plain status
    /// update: only the subject or an administrator.
    pub async fn cancel(
        &self,
        emergency_id: &str,
        actor: &Actor,
    ) -> Result<Emergency, CoordinationError> {
        let actor = *actor;
        self.mutate(emergency_id, move |record| {
            let authorized = actor.is_admin()
                || (actor.role == ActorRole::Patient && record.patient.patient_id == actor.id);
            if !authorized {
                return Err(CoordinationError::forbidden(&actor, "cancel the emergency"));
            }
            status::apply_transition(
                record,
                EmergencyStatus::Cancelled,
                Some("Emergency cancelled by user"),
                &actor,
                Utc::now(),
            )?;
            Ok(vec![EmergencyEvent::EmergencyCancelled {
                emergency_id: record.emergency_id.clone(),
                cancelled_by: actor.id,
            }])
        })
        .await
    }

    // ── Reads ────────────────────────────────────────────

    pub fn get(&self, emergency_id: &str) -> Result<Emergency, CoordinationError> {
        self.load(emergency_id)
    }

    pub fn active_emergencies(&self) -> Result<Vec<Emergency>, CoordinationError> {
        Ok(self.store.query(&EmergencyFilter::active())?)
    }

    /// A patient sees their own history; admin, doctor and hospital
    /// roles may look up anyone's.
    pub fn emergencies_for_patient(
        &self,
        patient_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<Emergency>, CoordinationError> {
        let authorized = actor.id == patient_id
            || matches!(
                actor.role,
                ActorRole::Admin | ActorRole::Doctor | ActorRole::Hospital
            );
        if !authorized {
            return Err(CoordinationError::forbidden(
                actor,
                "view another patient's emergencies",
            ));
        }
        Ok(self.store.query(&EmergencyFilter::for_patient(patient_id))?)
    }

    pub fn chat_messages(&self, emergency_id: &str) -> Result<Vec<ChatMessage>, CoordinationError> {
        Ok(self.load(emergency_id)?.chat_messages)
    }

    // ── Internals ────────────────────────────────────────

    fn load(&self, emergency_id: &str) -> Result<Emergency, CoordinationError> {
        self.store.load(emergency_id).map_err(|e| match e {
            DatabaseError::NotFound { .. } => {
                CoordinationError::NotFound(format!("emergency {emergency_id}"))
            }
            other => other.into(),
        })
    }

    /// Load, apply, persist, publish. On a version conflict the whole
    /// closure re-runs against a fresh load, so validation and
    /// authorization always see the state that will be persisted.
    async fn mutate<F>(&self, emergency_id: &str, apply: F) -> Result<Emergency, CoordinationError>
    where
        F: Fn(&mut Emergency) -> Result<Vec<EmergencyEvent>, CoordinationError>,
    {
        for attempt in 0..config::MAX_CONFLICT_RETRIES {
            let mut record = self.load(emergency_id)?;
            let events = apply(&mut record)?;
            record.updated_at = Utc::now();

            match self.store.save(&mut record) {
                Ok(()) => {
                    for event in events {
                        self.broker.publish(emergency_id, event);
                    }
                    if record.is_terminal() {
                        self.broker.close_scope(emergency_id);
                    }
                    return Ok(record);
                }
                Err(DatabaseError::Conflict { .. }) => {
                    tracing::debug!(emergency_id, attempt, "stale save, reloading");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CoordinationError::Conflict(emergency_id.to_string()))
    }
}
