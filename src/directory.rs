//! Collaborator boundaries: identity/role resolution and the response
//! resource directory.
//!
//! The coordination engine never owns user or resource data. It consumes
//! these two capability traits; deployments plug in their own directory
//! service. `InMemoryDirectory` implements both for tests and for the
//! bundled server binary.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{ActorRole, ResourceKind};
use crate::models::{BedAvailability, PatientSnapshot};

/// A registered emergency contact from the subject's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub contact_id: Option<Uuid>,
    pub name: String,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_primary: bool,
}

/// Directory view of an actor: role classification plus the profile
/// fields the engine denormalizes into emergency records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub id: Uuid,
    pub role: ActorRole,
    pub name: String,
    pub phone: Option<String>,
    pub age: Option<u32>,
    pub blood_group: Option<String>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl ActorProfile {
    pub fn snapshot(&self) -> PatientSnapshot {
        PatientSnapshot {
            patient_id: self.id,
            name: self.name.clone(),
            age: self.age,
            phone: self.phone.clone(),
            blood_group: self.blood_group.clone(),
        }
    }
}

/// Directory view of a response resource (ambulance unit or hospital).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub estimated_travel_minutes: Option<u32>,
    pub bed_availability: Option<BedAvailability>,
}

/// Resolves actor identifiers to roles and profile data. Backs every
/// authorization check and the creation-time patient snapshot.
pub trait IdentityDirectory: Send + Sync {
    fn resolve_actor(&self, id: Uuid) -> Option<ActorProfile>;
}

/// Resolves resource identifiers to their kind and contact metadata.
pub trait ResourceDirectory: Send + Sync {
    fn resolve_resource(&self, id: Uuid) -> Option<ResourceInfo>;
}

// ═══════════════════════════════════════════════════════════
// In-memory implementation
// ═══════════════════════════════════════════════════════════

/// In-memory directory for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryDirectory {
    actors: RwLock<HashMap<Uuid, ActorProfile>>,
    resources: RwLock<HashMap<Uuid, ResourceInfo>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_actor(&self, profile: ActorProfile) {
        self.actors
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(profile.id, profile);
    }

    pub fn insert_resource(&self, resource: ResourceInfo) {
        self.resources
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(resource.id, resource);
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn resolve_actor(&self, id: Uuid) -> Option<ActorProfile> {
        self.actors
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

impl ResourceDirectory for InMemoryDirectory {
    fn resolve_resource(&self, id: Uuid) -> Option<ResourceInfo> {
        self.resources
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}
