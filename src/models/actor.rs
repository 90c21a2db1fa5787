use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ActorRole;

/// The identity and role attempting an operation.
///
/// Every orchestrator operation takes an explicit `Actor`; there is no
/// ambient "current user" state. The role is resolved at the boundary
/// (HTTP layer or embedding application) through the identity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}
