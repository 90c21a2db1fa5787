pub mod repository;
pub mod sqlite;

pub use repository::emergency::SqliteEmergencyStore;
pub use sqlite::{open_database, open_memory_database};

use thiserror::Error;

use crate::models::{Emergency, EmergencyFilter};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// Optimistic-concurrency failure: another writer saved a newer
    /// version after our read. Reload and retry.
    #[error("Version conflict on {id}: expected v{expected_version}")]
    Conflict { id: String, expected_version: i64 },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Durable keyed storage for emergency records.
///
/// `save` guarantees durability before returning and enforces optimistic
/// concurrency: a save based on a stale read fails with
/// [`DatabaseError::Conflict`] and must be retried against a fresh load.
pub trait EmergencyStore: Send + Sync {
    fn load(&self, emergency_id: &str) -> Result<Emergency, DatabaseError>;

    /// Persist the record. New records (version 0) are inserted; existing
    /// records are updated only if the stored version still matches. On
    /// success the record's version is bumped in place.
    fn save(&self, record: &mut Emergency) -> Result<(), DatabaseError>;

    fn query(&self, filter: &EmergencyFilter) -> Result<Vec<Emergency>, DatabaseError>;
}
