//! Domain error taxonomy for coordination operations.
//!
//! Validation, Forbidden, NotFound and InvalidTransition surface to the
//! caller unchanged. Store conflicts are retried internally a bounded
//! number of times before becoming `Conflict`. External delivery failures
//! never appear here: they are recorded on the notification attempt.

use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{ActorRole, EmergencyStatus};

#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// Malformed or missing input. Lists every violation, not just the first.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{} {} is not permitted to {}", .role.as_str(), .actor_id, .action)]
    Forbidden {
        actor_id: Uuid,
        role: ActorRole,
        action: &'static str,
    },

    #[error("illegal status transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: EmergencyStatus,
        to: EmergencyStatus,
    },

    /// Concurrent modification persisted after our read; retries exhausted.
    #[error("concurrent modification of {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(#[from] DatabaseError),
}

impl CoordinationError {
    pub fn forbidden(actor: &crate::models::Actor, action: &'static str) -> Self {
        Self::Forbidden {
            actor_id: actor.id,
            role: actor.role,
            action,
        }
    }
}
