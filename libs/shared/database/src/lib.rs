mod schema;

pub use schema::SCHEMA;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use shared_config::AppConfig;
use shared_models::activity::{ActivityNotifier, LogNotifier};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Shared handle to the embedded store. Operations are short single
/// statements or small transactions; the mutex serializes writers
/// in-process, on top of the schema-level constraints.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a read or single-statement write against the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&conn)
    }

    /// Run a multi-statement sequence atomically. The closure's error rolls
    /// the transaction back.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Transaction) -> DbResult<T>) -> DbResult<T> {
        let mut conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// True when the error is a UNIQUE/constraint failure, e.g. the active-slot
/// index rejecting a double booking that raced past the availability check.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Shared request state: configuration, the embedded store, and the
/// activity-log collaborator.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub activity: Arc<dyn ActivityNotifier>,
}

impl AppState {
    pub fn new(config: AppConfig) -> DbResult<Self> {
        let db = Database::open(&config.database_path)?;
        Ok(Self {
            config,
            db,
            activity: Arc::new(LogNotifier),
        })
    }

    /// In-memory state for tests.
    pub fn in_memory() -> DbResult<Arc<Self>> {
        Ok(Arc::new(Self {
            config: AppConfig::default(),
            db: Database::open_in_memory()?,
            activity: Arc::new(LogNotifier),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");

        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO patients (id, name, status, registered_date)
                 VALUES ('p1', 'Ahmad', 'Active', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.filter_map(|r| r.ok()).collect())
            })
            .unwrap();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"patient_details".to_string()));
        assert!(tables.contains(&"appointments".to_string()));
    }

    #[test]
    fn test_active_slot_index_rejects_duplicates() {
        let db = Database::open_in_memory().unwrap();

        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO patients (id, name, status, registered_date)
                 VALUES ('p1', 'Ahmad', 'Active', '2024-01-01T00:00:00Z')",
                [],
            )?;
            conn.execute(
                "INSERT INTO appointments
                 (id, patient_id, appointment_type, date, time, visit_type,
                  status, created_at, updated_at)
                 VALUES ('a1', 'p1', 'Consultation', '2024-02-15', '8:00 AM',
                         'In_person', 'Scheduled', '', '')",
                [],
            )?;
            let dup = conn.execute(
                "INSERT INTO appointments
                 (id, patient_id, appointment_type, date, time, visit_type,
                  status, created_at, updated_at)
                 VALUES ('a2', 'p1', 'Consultation', '2024-02-15', '8:00 AM',
                         'In_person', 'Scheduled', '', '')",
            [],
            );
            Ok(dup)
        });

        let dup = result.unwrap();
        assert!(matches!(dup, Err(ref e) if is_unique_violation(e)));
    }

    #[test]
    fn test_finished_status_frees_slot() {
        let db = Database::open_in_memory().unwrap();

        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO patients (id, name, status, registered_date)
                 VALUES ('p1', 'Ahmad', 'Active', '2024-01-01T00:00:00Z')",
                [],
            )?;
            conn.execute(
                "INSERT INTO appointments
                 (id, patient_id, appointment_type, date, time, visit_type,
                  status, created_at, updated_at)
                 VALUES ('a1', 'p1', 'Consultation', '2024-02-15', '8:00 AM',
                         'In_person', 'Cancelled', '', '')",
                [],
            )?;
            // Cancelled booking is outside the partial index.
            conn.execute(
                "INSERT INTO appointments
                 (id, patient_id, appointment_type, date, time, visit_type,
                  status, created_at, updated_at)
                 VALUES ('a2', 'p1', 'Consultation', '2024-02-15', '8:00 AM',
                         'In_person', 'Scheduled', '', '')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_patient_delete_cascades() {
        let db = Database::open_in_memory().unwrap();

        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO patients (id, name, status, registered_date)
                 VALUES ('p1', 'Ahmad', 'Active', '2024-01-01T00:00:00Z')",
                [],
            )?;
            conn.execute(
                "INSERT INTO patient_details (patient_id, weight) VALUES ('p1', 70.0)",
                [],
            )?;
            conn.execute(
                "INSERT INTO appointments
                 (id, patient_id, appointment_type, date, time, visit_type,
                  status, created_at, updated_at)
                 VALUES ('a1', 'p1', 'Consultation', '2024-02-15', '8:00 AM',
                         'In_person', 'Scheduled', '', '')",
                [],
            )?;
            conn.execute("DELETE FROM patients WHERE id = 'p1'", [])?;

            let details: i64 =
                conn.query_row("SELECT COUNT(*) FROM patient_details", [], |r| r.get(0))?;
            let appts: i64 =
                conn.query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))?;
            assert_eq!(details, 0);
            assert_eq!(appts, 0);
            Ok(())
        })
        .unwrap();
    }
}
