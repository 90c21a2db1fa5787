//! Status state machine.
//!
//! Legal graph: forward-only along
//! `pending -> assigned -> en-route -> arrived -> in-transit -> completed`
//! (skipping ahead is legal), with `cancelled` reachable from any
//! non-terminal state. `completed` and `cancelled` are terminal.
//!
//! The machine mutates the in-memory record only: it appends the timeline
//! event, stamps terminal timestamps and recomputes metrics. Persistence
//! and fan-out happen in the orchestration layer after a successful
//! transition.

use chrono::{DateTime, Utc};

use crate::error::CoordinationError;
use crate::models::enums::{ActorRole, EmergencyStatus, TimelineEventKind};
use crate::models::{Actor, Emergency};
use crate::timeline;

/// The forward chain. `cancelled` sits outside it.
const CHAIN: [EmergencyStatus; 6] = [
    EmergencyStatus::Pending,
    EmergencyStatus::Assigned,
    EmergencyStatus::EnRoute,
    EmergencyStatus::Arrived,
    EmergencyStatus::InTransit,
    EmergencyStatus::Completed,
];

fn chain_position(status: EmergencyStatus) -> Option<usize> {
    CHAIN.iter().position(|s| *s == status)
}

/// Whether `from -> to` is a legal transition.
pub fn is_legal_transition(from: EmergencyStatus, to: EmergencyStatus) -> bool {
    if from.is_terminal() || from == to {
        return false;
    }
    if to == EmergencyStatus::Cancelled {
        return true;
    }
    match (chain_position(from), chain_position(to)) {
        (Some(from_pos), Some(to_pos)) => to_pos > from_pos,
        _ => false,
    }
}

/// Whether this actor may change the record's status: administrators,
/// ambulance crews, hospitals, or the emergency's own subject.
pub fn may_change_status(actor: &Actor, record: &Emergency) -> bool {
    match actor.role {
        ActorRole::Admin | ActorRole::Ambulance | ActorRole::Hospital => true,
        ActorRole::Patient => record.patient.patient_id == actor.id,
        ActorRole::Doctor | ActorRole::BloodBank => false,
    }
}

/// Timeline event kind recorded for a transition into `status`.
fn event_kind_for(status: EmergencyStatus) -> Option<TimelineEventKind> {
    match status {
        EmergencyStatus::Assigned => Some(TimelineEventKind::Assigned),
        EmergencyStatus::EnRoute => Some(TimelineEventKind::AmbulanceDispatched),
        EmergencyStatus::Arrived => Some(TimelineEventKind::AmbulanceArrived),
        EmergencyStatus::InTransit => Some(TimelineEventKind::PatientPickedUp),
        EmergencyStatus::Completed => Some(TimelineEventKind::Completed),
        EmergencyStatus::Cancelled => Some(TimelineEventKind::Cancelled),
        EmergencyStatus::Pending => None,
    }
}

/// Validate and apply a status transition.
///
/// Side effects on success: status + `updated_by` set, exactly one
/// timeline event appended, `completed_at`/`cancelled_at` stamped on
/// entering the corresponding terminal state, and response-time metrics
/// recomputed on completion.
pub fn apply_transition(
    record: &mut Emergency,
    new_status: EmergencyStatus,
    notes: Option<&str>,
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<(), CoordinationError> {
    if !may_change_status(actor, record) {
        return Err(CoordinationError::forbidden(actor, "change emergency status"));
    }

    let from = record.status;
    if !is_legal_transition(from, new_status) {
        return Err(CoordinationError::InvalidTransition {
            from,
            to: new_status,
        });
    }
    let Some(kind) = event_kind_for(new_status) else {
        return Err(CoordinationError::InvalidTransition {
            from,
            to: new_status,
        });
    };

    record.status = new_status;
    record.updated_by = Some(actor.id);

    let description = notes
        .map(str::to_string)
        .unwrap_or_else(|| format!("Status updated to {}", new_status.as_str()));
    timeline::append(record, kind, description, actor, at);

    match new_status {
        EmergencyStatus::Completed => {
            record.completed_at = Some(at);
            record.response_time = timeline::derive_metrics(record);
        }
        EmergencyStatus::Cancelled => {
            record.cancelled_at = Some(at);
        }
        _ => {}
    }

    tracing::info!(
        emergency_id = %record.emergency_id,
        from = from.as_str(),
        to = new_status.as_str(),
        actor = %actor.id,
        "status transition applied"
    );
    Ok(())
}
