//! Emergency record persistence: one document row per emergency.
//!
//! The full record is stored as a JSON document; a handful of indexed
//! columns (status, patient, triage axes, timestamps) exist only to serve
//! the list queries without deserializing every row. `update_emergency`
//! carries the optimistic-concurrency check: the UPDATE is guarded by
//! `WHERE version = ?` and zero affected rows means a concurrent writer
//! got there first.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::sqlite::{open_database, open_memory_database};
use crate::db::{DatabaseError, EmergencyStore};
use crate::models::{Emergency, EmergencyFilter};

pub fn insert_emergency(conn: &Connection, record: &Emergency) -> Result<(), DatabaseError> {
    let document = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO emergencies
         (emergency_id, patient_id, status, severity, priority, kind,
          created_at, updated_at, version, document)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.emergency_id,
            record.patient.patient_id.to_string(),
            record.status.as_str(),
            record.severity.as_str(),
            record.priority.as_str(),
            record.kind.as_str(),
            record.created_at,
            record.updated_at,
            record.version,
            document,
        ],
    )?;
    Ok(())
}

/// Update an existing row, guarded by the version the caller read.
pub fn update_emergency(
    conn: &Connection,
    record: &Emergency,
    expected_version: i64,
) -> Result<(), DatabaseError> {
    let document = serde_json::to_string(record)?;
    let affected = conn.execute(
        "UPDATE emergencies
         SET patient_id = ?1, status = ?2, severity = ?3, priority = ?4,
             kind = ?5, updated_at = ?6, version = ?7, document = ?8
         WHERE emergency_id = ?9 AND version = ?10",
        params![
            record.patient.patient_id.to_string(),
            record.status.as_str(),
            record.severity.as_str(),
            record.priority.as_str(),
            record.kind.as_str(),
            record.updated_at,
            record.version,
            document,
            record.emergency_id,
            expected_version,
        ],
    )?;

    if affected == 0 {
        let exists = conn
            .query_row(
                "SELECT 1 FROM emergencies WHERE emergency_id = ?1",
                params![record.emergency_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            return Err(DatabaseError::Conflict {
                id: record.emergency_id.clone(),
                expected_version,
            });
        }
        return Err(DatabaseError::NotFound {
            entity_type: "emergency".into(),
            id: record.emergency_id.clone(),
        });
    }
    Ok(())
}

pub fn load_emergency(conn: &Connection, emergency_id: &str) -> Result<Emergency, DatabaseError> {
    let document = conn
        .query_row(
            "SELECT document FROM emergencies WHERE emergency_id = ?1",
            params![emergency_id],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "emergency".into(),
            id: emergency_id.to_string(),
        })?;
    Ok(serde_json::from_str(&document)?)
}

pub fn query_emergencies(
    conn: &Connection,
    filter: &EmergencyFilter,
) -> Result<Vec<Emergency>, DatabaseError> {
    let mut sql = String::from("SELECT document FROM emergencies");
    let mut clauses: Vec<String> = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        clauses.push(format!("status IN ({placeholders})"));
        args.extend(statuses.iter().map(|s| s.as_str().to_string()));
    }
    if let Some(patient_id) = filter.patient_id {
        clauses.push("patient_id = ?".into());
        args.push(patient_id.to_string());
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
        row.get::<_, String>(0)
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(serde_json::from_str(&row?)?);
    }
    Ok(records)
}

// ═══════════════════════════════════════════════════════════
// SqliteEmergencyStore — the EmergencyStore implementation
// ═══════════════════════════════════════════════════════════

/// SQLite-backed emergency record store.
pub struct SqliteEmergencyStore {
    conn: Mutex<Connection>,
}

impl SqliteEmergencyStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl EmergencyStore for SqliteEmergencyStore {
    fn load(&self, emergency_id: &str) -> Result<Emergency, DatabaseError> {
        let conn = self.lock()?;
        load_emergency(&conn, emergency_id)
    }

    fn save(&self, record: &mut Emergency) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        if record.version == 0 {
            record.version = 1;
            if let Err(e) = insert_emergency(&conn, record) {
                record.version = 0;
                return Err(e);
            }
            Ok(())
        } else {
            let expected = record.version;
            record.version += 1;
            if let Err(e) = update_emergency(&conn, record, expected) {
                record.version = expected;
                return Err(e);
            }
            Ok(())
        }
    }

    fn query(&self, filter: &EmergencyFilter) -> Result<Vec<Emergency>, DatabaseError> {
        let conn = self.lock()?;
        query_emergencies(&conn, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{EmergencyStatus, EmergencyType, Priority, Severity};
    use crate::models::{generate_emergency_id, EmergencyLocation, PatientSnapshot};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_record(patient_id: Uuid) -> Emergency {
        let now = Utc::now();
        Emergency::new(
            generate_emergency_id(now),
            EmergencyType::Medical,
            Severity::High,
            Priority::Urgent,
            PatientSnapshot {
                patient_id,
                name: "Test Patient".into(),
                age: Some(50),
                phone: None,
                blood_group: None,
            },
            EmergencyLocation {
                address: None,
                latitude: 40.0,
                longitude: -8.0,
                accuracy_meters: None,
                recorded_at: now,
            },
            "test".into(),
            patient_id,
            now,
        )
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = SqliteEmergencyStore::in_memory().unwrap();
        let mut record = sample_record(Uuid::new_v4());

        store.save(&mut record).unwrap();
        assert_eq!(record.version, 1);

        let loaded = store.load(&record.emergency_id).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn load_unknown_id_is_not_found() {
        let store = SqliteEmergencyStore::in_memory().unwrap();
        let err = store.load("EMG-0-ZZZZZ").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn save_bumps_version_each_time() {
        let store = SqliteEmergencyStore::in_memory().unwrap();
        let mut record = sample_record(Uuid::new_v4());
        store.save(&mut record).unwrap();
        record.description = "updated".into();
        store.save(&mut record).unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(store.load(&record.emergency_id).unwrap().version, 2);
    }

    #[test]
    fn stale_save_conflicts_and_leaves_version_unchanged() {
        let store = SqliteEmergencyStore::in_memory().unwrap();
        let mut record = sample_record(Uuid::new_v4());
        store.save(&mut record).unwrap();

        // Two readers pick up version 1.
        let mut first = store.load(&record.emergency_id).unwrap();
        let mut second = store.load(&record.emergency_id).unwrap();

        first.description = "first writer".into();
        store.save(&mut first).unwrap();

        second.description = "second writer".into();
        let err = store.save(&mut second).unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict { .. }));
        assert_eq!(second.version, 1, "failed save must not bump the version");

        // A fresh reload observes the first writer and can save again.
        let mut fresh = store.load(&record.emergency_id).unwrap();
        assert_eq!(fresh.description, "first writer");
        fresh.description = "second writer, retried".into();
        store.save(&mut fresh).unwrap();
        assert_eq!(fresh.version, 3);
    }

    #[test]
    fn active_query_skips_terminal_records() {
        let store = SqliteEmergencyStore::in_memory().unwrap();

        let mut active = sample_record(Uuid::new_v4());
        store.save(&mut active).unwrap();

        let mut done = sample_record(Uuid::new_v4());
        done.status = EmergencyStatus::Completed;
        store.save(&mut done).unwrap();

        let results = store.query(&EmergencyFilter::active()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].emergency_id, active.emergency_id);
    }

    #[test]
    fn patient_query_returns_full_history() {
        let store = SqliteEmergencyStore::in_memory().unwrap();
        let patient = Uuid::new_v4();

        let mut first = sample_record(patient);
        first.status = EmergencyStatus::Cancelled;
        store.save(&mut first).unwrap();
        let mut second = sample_record(patient);
        store.save(&mut second).unwrap();
        let mut other = sample_record(Uuid::new_v4());
        store.save(&mut other).unwrap();

        let results = store.query(&EmergencyFilter::for_patient(patient)).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.patient.patient_id == patient));
    }

    #[test]
    fn empty_filter_returns_everything_newest_first() {
        let store = SqliteEmergencyStore::in_memory().unwrap();
        for _ in 0..3 {
            let mut record = sample_record(Uuid::new_v4());
            store.save(&mut record).unwrap();
        }
        let results = store.query(&EmergencyFilter::default()).unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }
}
