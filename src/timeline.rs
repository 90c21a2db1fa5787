//! Timeline recorder: append-only audit events and the response-time
//! metrics derived from them.
//!
//! Appending mutates the in-memory record only; the orchestrator persists
//! afterwards. Metric derivation scans for the first occurrence of each
//! milestone kind and is idempotent and side-effect-free.

use chrono::{DateTime, Utc};

use crate::models::enums::TimelineEventKind;
use crate::models::{Actor, Emergency, ResponseMetrics, TimelineEvent};

/// Append one audit event to the record's timeline.
pub fn append(
    record: &mut Emergency,
    kind: TimelineEventKind,
    description: impl Into<String>,
    actor: &Actor,
    at: DateTime<Utc>,
) {
    record.timeline.push(TimelineEvent {
        kind,
        timestamp: at,
        description: description.into(),
        actor_id: actor.id,
        actor_role: actor.role,
    });
}

/// First timeline event of the given kind, in append order.
/// First-match keeps metrics anchored to the original dispatch decision
/// even when reassignment appends further `assigned` events.
pub fn first_event(record: &Emergency, kind: TimelineEventKind) -> Option<&TimelineEvent> {
    record.timeline.iter().find(|event| event.kind == kind)
}

/// Derive the three response-time metrics, in whole seconds, from the
/// `created` / `assigned` / `ambulance-arrived` milestones. A missing
/// milestone leaves the corresponding metric unset.
pub fn derive_metrics(record: &Emergency) -> ResponseMetrics {
    let created = first_event(record, TimelineEventKind::Created);
    let assigned = first_event(record, TimelineEventKind::Assigned);
    let arrived = first_event(record, TimelineEventKind::AmbulanceArrived);

    let mut metrics = ResponseMetrics::default();
    if let (Some(created), Some(assigned)) = (created, assigned) {
        metrics.alert_to_assignment_secs =
            Some((assigned.timestamp - created.timestamp).num_seconds());
    }
    if let (Some(assigned), Some(arrived)) = (assigned, arrived) {
        metrics.assignment_to_arrival_secs =
            Some((arrived.timestamp - assigned.timestamp).num_seconds());
    }
    if let (Some(created), Some(arrived)) = (created, arrived) {
        metrics.total_response_secs = Some((arrived.timestamp - created.timestamp).num_seconds());
    }
    metrics
}
