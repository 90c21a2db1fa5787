use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(EmergencyType {
    Medical => "medical",
    Trauma => "trauma",
    Cardiac => "cardiac",
    Respiratory => "respiratory",
    Neurological => "neurological",
    Pediatric => "pediatric",
    Obstetric => "obstetric",
    Other => "other",
});

str_enum!(Severity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

str_enum!(Priority {
    Routine => "routine",
    Urgent => "urgent",
    Emergency => "emergency",
    Immediate => "immediate",
});

str_enum!(EmergencyStatus {
    Pending => "pending",
    Assigned => "assigned",
    EnRoute => "en-route",
    Arrived => "arrived",
    InTransit => "in-transit",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl EmergencyStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The non-terminal statuses, for active-list queries.
    pub fn active_statuses() -> [EmergencyStatus; 5] {
        [
            Self::Pending,
            Self::Assigned,
            Self::EnRoute,
            Self::Arrived,
            Self::InTransit,
        ]
    }
}

str_enum!(TimelineEventKind {
    Created => "created",
    Assigned => "assigned",
    HospitalAssigned => "hospital-assigned",
    AmbulanceDispatched => "ambulance-dispatched",
    AmbulanceArrived => "ambulance-arrived",
    PatientPickedUp => "patient-picked-up",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(ActorRole {
    Patient => "patient",
    Doctor => "doctor",
    Hospital => "hospital",
    BloodBank => "blood-bank",
    Ambulance => "ambulance",
    Admin => "admin",
});

str_enum!(ResourceKind {
    Ambulance => "ambulance",
    Hospital => "hospital",
});

str_enum!(NotificationChannel {
    Sms => "sms",
    Email => "email",
    Push => "push",
    Call => "call",
});

str_enum!(DeliveryStatus {
    Pending => "pending",
    Sent => "sent",
    Delivered => "delivered",
    Failed => "failed",
});

str_enum!(Consciousness {
    Alert => "alert",
    Verbal => "verbal",
    Pain => "pain",
    Unresponsive => "unresponsive",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn emergency_status_round_trip() {
        for (variant, s) in [
            (EmergencyStatus::Pending, "pending"),
            (EmergencyStatus::Assigned, "assigned"),
            (EmergencyStatus::EnRoute, "en-route"),
            (EmergencyStatus::Arrived, "arrived"),
            (EmergencyStatus::InTransit, "in-transit"),
            (EmergencyStatus::Completed, "completed"),
            (EmergencyStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EmergencyStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn only_completed_and_cancelled_are_terminal() {
        assert!(EmergencyStatus::Completed.is_terminal());
        assert!(EmergencyStatus::Cancelled.is_terminal());
        for status in EmergencyStatus::active_statuses() {
            assert!(!status.is_terminal(), "{} must be active", status.as_str());
        }
    }

    #[test]
    fn emergency_type_round_trip() {
        for (variant, s) in [
            (EmergencyType::Medical, "medical"),
            (EmergencyType::Trauma, "trauma"),
            (EmergencyType::Cardiac, "cardiac"),
            (EmergencyType::Respiratory, "respiratory"),
            (EmergencyType::Neurological, "neurological"),
            (EmergencyType::Pediatric, "pediatric"),
            (EmergencyType::Obstetric, "obstetric"),
            (EmergencyType::Other, "other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EmergencyType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn timeline_event_kind_round_trip() {
        for (variant, s) in [
            (TimelineEventKind::Created, "created"),
            (TimelineEventKind::Assigned, "assigned"),
            (TimelineEventKind::HospitalAssigned, "hospital-assigned"),
            (TimelineEventKind::AmbulanceDispatched, "ambulance-dispatched"),
            (TimelineEventKind::AmbulanceArrived, "ambulance-arrived"),
            (TimelineEventKind::PatientPickedUp, "patient-picked-up"),
            (TimelineEventKind::Completed, "completed"),
            (TimelineEventKind::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TimelineEventKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn actor_role_round_trip() {
        for (variant, s) in [
            (ActorRole::Patient, "patient"),
            (ActorRole::Doctor, "doctor"),
            (ActorRole::Hospital, "hospital"),
            (ActorRole::BloodBank, "blood-bank"),
            (ActorRole::Ambulance, "ambulance"),
            (ActorRole::Admin, "admin"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ActorRole::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&EmergencyStatus::EnRoute).unwrap();
        assert_eq!(json, "\"en-route\"");
        let back: EmergencyStatus = serde_json::from_str("\"in-transit\"").unwrap();
        assert_eq!(back, EmergencyStatus::InTransit);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(EmergencyStatus::from_str("paused").is_err());
        assert!(ActorRole::from_str("dispatcher").is_err());
        assert!(DeliveryStatus::from_str("").is_err());
    }
}
