//! Assignment coordinator: attach an ambulance unit or receiving hospital
//! to an emergency.
//!
//! Only administrators and hospital actors may assign. The resource must
//! resolve to the expected kind; anything else is reported as not found
//! rather than leaking what the identifier actually is. Reassignment
//! overwrites, never appends; terminal records reject both forms.

use chrono::{DateTime, Utc};

use crate::directory::ResourceInfo;
use crate::error::CoordinationError;
use crate::models::enums::{ActorRole, EmergencyStatus, ResourceKind, TimelineEventKind};
use crate::models::{Actor, AmbulanceAssignment, Emergency, HospitalAssignment};
use crate::status;
use crate::timeline;

/// Only administrators and hospital actors dispatch resources.
pub fn may_assign(actor: &Actor) -> bool {
    matches!(actor.role, ActorRole::Admin | ActorRole::Hospital)
}

/// Assign an ambulance, driving `pending -> assigned` through the state
/// machine. Reassignment on an already-dispatched emergency overwrites
/// the assignment without a further status change.
pub fn assign_ambulance(
    record: &mut Emergency,
    resource: &ResourceInfo,
    estimated_arrival: DateTime<Utc>,
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<(), CoordinationError> {
    if !may_assign(actor) {
        return Err(CoordinationError::forbidden(actor, "assign an ambulance"));
    }
    if resource.kind != ResourceKind::Ambulance {
        return Err(CoordinationError::NotFound(format!(
            "ambulance {}",
            resource.id
        )));
    }
    if record.is_terminal() {
        return Err(CoordinationError::InvalidTransition {
            from: record.status,
            to: EmergencyStatus::Assigned,
        });
    }

    record.assigned_ambulance = Some(AmbulanceAssignment {
        resource_id: resource.id,
        crew_name: resource.name.clone(),
        crew_phone: resource.phone.clone(),
        estimated_arrival,
        current_location: None,
    });

    let description = format!("Ambulance assigned: {}", resource.name);
    if record.status == EmergencyStatus::Pending {
        status::apply_transition(
            record,
            EmergencyStatus::Assigned,
            Some(&description),
            actor,
            at,
        )?;
    } else {
        record.updated_by = Some(actor.id);
        timeline::append(record, TimelineEventKind::Assigned, description, actor, at);
    }
    Ok(())
}

/// Pre-select a receiving hospital. Never changes status: a hospital may
/// be chosen before any ambulance is dispatched.
pub fn assign_hospital(
    record: &mut Emergency,
    resource: &ResourceInfo,
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<(), CoordinationError> {
    if !may_assign(actor) {
        return Err(CoordinationError::forbidden(actor, "assign a hospital"));
    }
    if resource.kind != ResourceKind::Hospital {
        return Err(CoordinationError::NotFound(format!(
            "hospital {}",
            resource.id
        )));
    }
    if record.is_terminal() {
        return Err(CoordinationError::InvalidTransition {
            from: record.status,
            to: record.status,
        });
    }

    record.assigned_hospital = Some(HospitalAssignment {
        resource_id: resource.id,
        name: resource.name.clone(),
        address: resource.address.clone(),
        estimated_travel_minutes: resource.estimated_travel_minutes,
        bed_availability: resource.bed_availability,
    });
    record.updated_by = Some(actor.id);
    timeline::append(
        record,
        TimelineEventKind::HospitalAssigned,
        format!("Hospital selected: {}", resource.name),
        actor,
        at,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{EmergencyType, Priority, Severity};
    use crate::models::{BedAvailability, EmergencyLocation, PatientSnapshot};
    use uuid::Uuid;

    fn record() -> Emergency {
        let now = Utc::now();
        let patient_id = Uuid::new_v4();
        let mut record = Emergency::new(
            "EMG-1-TESTC".into(),
            EmergencyType::Medical,
            Severity::Critical,
            Priority::Immediate,
            PatientSnapshot {
                patient_id,
                name: "P".into(),
                age: None,
                phone: None,
                blood_group: None,
            },
            EmergencyLocation {
                address: None,
                latitude: 2.0,
                longitude: 2.0,
                accuracy_meters: None,
                recorded_at: now,
            },
            "desc".into(),
            patient_id,
            now,
        );
        timeline::append(
            &mut record,
            TimelineEventKind::Created,
            "Emergency alert created",
            &Actor::new(patient_id, ActorRole::Patient),
            now,
        );
        record
    }

    fn ambulance_unit(name: &str) -> ResourceInfo {
        ResourceInfo {
            id: Uuid::new_v4(),
            kind: ResourceKind::Ambulance,
            name: name.into(),
            phone: Some("+100".into()),
            address: None,
            estimated_travel_minutes: None,
            bed_availability: None,
        }
    }

    fn hospital(name: &str) -> ResourceInfo {
        ResourceInfo {
            id: Uuid::new_v4(),
            kind: ResourceKind::Hospital,
            name: name.into(),
            phone: None,
            address: Some("12 Harbour Rd".into()),
            estimated_travel_minutes: Some(14),
            bed_availability: Some(BedAvailability {
                general: 8,
                icu: 2,
                emergency: 3,
            }),
        }
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), ActorRole::Admin)
    }

    #[test]
    fn assignment_moves_pending_to_assigned() {
        let mut record = record();
        let unit = ambulance_unit("Unit 7");
        let eta = Utc::now();

        assign_ambulance(&mut record, &unit, eta, &admin(), Utc::now()).unwrap();

        assert_eq!(record.status, EmergencyStatus::Assigned);
        let assignment = record.assigned_ambulance.as_ref().unwrap();
        assert_eq!(assignment.resource_id, unit.id);
        assert_eq!(assignment.crew_name, "Unit 7");
        let last = record.timeline.last().unwrap();
        assert_eq!(last.kind, TimelineEventKind::Assigned);
        assert!(last.description.contains("Unit 7"));
    }

    #[test]
    fn patient_cannot_assign() {
        let mut record = record();
        let subject = Actor::new(record.patient.patient_id, ActorRole::Patient);
        let err = assign_ambulance(
            &mut record,
            &ambulance_unit("Unit 1"),
            Utc::now(),
            &subject,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoordinationError::Forbidden { .. }));
        assert_eq!(record.status, EmergencyStatus::Pending);
        assert!(record.assigned_ambulance.is_none());
    }

    #[test]
    fn wrong_resource_kind_is_not_found() {
        let mut record = record();
        let err = assign_ambulance(
            &mut record,
            &hospital("General"),
            Utc::now(),
            &admin(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoordinationError::NotFound(_)));
        assert!(record.assigned_ambulance.is_none());
    }

    #[test]
    fn reassignment_overwrites_without_status_change() {
        let mut record = record();
        let actor = admin();
        assign_ambulance(&mut record, &ambulance_unit("Unit 1"), Utc::now(), &actor, Utc::now())
            .unwrap();
        let events_after_first = record.timeline.len();

        let replacement = ambulance_unit("Unit 2");
        assign_ambulance(&mut record, &replacement, Utc::now(), &actor, Utc::now()).unwrap();

        assert_eq!(record.status, EmergencyStatus::Assigned);
        assert_eq!(
            record.assigned_ambulance.as_ref().unwrap().resource_id,
            replacement.id
        );
        assert_eq!(record.timeline.len(), events_after_first + 1);
    }

    #[test]
    fn terminal_record_rejects_assignment() {
        let mut record = record();
        let actor = admin();
        status::apply_transition(&mut record, EmergencyStatus::Cancelled, None, &actor, Utc::now())
            .unwrap();

        let err = assign_ambulance(
            &mut record,
            &ambulance_unit("Unit 9"),
            Utc::now(),
            &actor,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoordinationError::InvalidTransition { .. }));
    }

    #[test]
    fn hospital_assignment_keeps_status_and_snapshots_beds() {
        let mut record = record();
        let target = hospital("St. Vincent General");

        assign_hospital(&mut record, &target, &admin(), Utc::now()).unwrap();

        assert_eq!(record.status, EmergencyStatus::Pending);
        let assignment = record.assigned_hospital.as_ref().unwrap();
        assert_eq!(assignment.name, "St. Vincent General");
        assert_eq!(
            assignment.bed_availability,
            Some(BedAvailability {
                general: 8,
                icu: 2,
                emergency: 3,
            })
        );
        assert_eq!(
            record.timeline.last().unwrap().kind,
            TimelineEventKind::HospitalAssigned
        );
    }

    #[test]
    fn hospital_assignment_requires_hospital_kind() {
        let mut record = record();
        let err =
            assign_hospital(&mut record, &ambulance_unit("Unit 3"), &admin(), Utc::now())
                .unwrap_err();
        assert!(matches!(err, CoordinationError::NotFound(_)));
    }
}
