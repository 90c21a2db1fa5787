use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::EmergencyStatus;

/// Predicate for store queries. Empty filter matches everything;
/// results are always newest-first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyFilter {
    pub statuses: Option<Vec<EmergencyStatus>>,
    pub patient_id: Option<Uuid>,
}

impl EmergencyFilter {
    /// All emergencies in a non-terminal status.
    pub fn active() -> Self {
        Self {
            statuses: Some(EmergencyStatus::active_statuses().to_vec()),
            patient_id: None,
        }
    }

    /// Full history for one patient, terminal records included.
    pub fn for_patient(patient_id: Uuid) -> Self {
        Self {
            statuses: None,
            patient_id: Some(patient_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_filter_excludes_terminal_statuses() {
        let filter = EmergencyFilter::active();
        let statuses = filter.statuses.unwrap();
        assert_eq!(statuses.len(), 5);
        assert!(!statuses.contains(&EmergencyStatus::Completed));
        assert!(!statuses.contains(&EmergencyStatus::Cancelled));
    }

    #[test]
    fn patient_filter_keeps_all_statuses() {
        let id = Uuid::new_v4();
        let filter = EmergencyFilter::for_patient(id);
        assert!(filter.statuses.is_none());
        assert_eq!(filter.patient_id, Some(id));
    }
}
