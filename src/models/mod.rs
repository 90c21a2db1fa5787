pub mod actor;
pub mod emergency;
pub mod enums;
pub mod filters;

pub use actor::Actor;
pub use emergency::{
    generate_emergency_id, Address, AmbulanceAssignment, BedAvailability, ChatMessage,
    ContactNotification, Emergency, EmergencyLocation, GeoPoint, HospitalAssignment,
    NotificationAttempt, PatientSnapshot, ResponseMetrics, Symptom, TimelineEvent,
    TriageAnnotation, VitalSigns,
};
pub use filters::EmergencyFilter;
