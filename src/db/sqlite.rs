use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// One document row per emergency. Indexed columns mirror the fields the
/// active-list and per-patient queries filter on; the full record lives
/// in the JSON document column.
const MIGRATION_V1: &str = "
CREATE TABLE IF NOT EXISTS emergencies (
    emergency_id TEXT PRIMARY KEY,
    patient_id   TEXT NOT NULL,
    status       TEXT NOT NULL,
    severity     TEXT NOT NULL,
    priority     TEXT NOT NULL,
    kind         TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    version      INTEGER NOT NULL,
    document     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_emergencies_status ON emergencies(status);
CREATE INDEX IF NOT EXISTS idx_emergencies_patient ON emergencies(patient_id);
CREATE INDEX IF NOT EXISTS idx_emergencies_created ON emergencies(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_emergencies_triage ON emergencies(severity, priority);
";

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(1, MIGRATION_V1)];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
            set_version(conn, version)?;
        }
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0)
}

fn set_version(conn: &Connection, version: i64) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database_migrates_to_latest() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = open_memory_database().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn emergencies_table_exists() {
        let conn = open_memory_database().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='emergencies'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn on_disk_database_reopens() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.db");
        {
            let conn = open_database(&path).unwrap();
            conn.execute(
                "INSERT INTO emergencies
                 (emergency_id, patient_id, status, severity, priority, kind,
                  created_at, updated_at, version, document)
                 VALUES ('EMG-1-AAAAA', 'p', 'pending', 'high', 'urgent', 'medical',
                         '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z', 1, '{}')",
                [],
            )
            .unwrap();
        }
        let conn = open_database(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM emergencies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
