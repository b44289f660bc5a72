//! SQLite storage and the transactional unit of work.
//!
//! Every business operation runs inside [`Database::with_transaction`]. The closure receives a
//! [`UnitOfWork`]; returning `Ok` commits, returning `Err` (or unwinding) rolls the whole
//! transaction back. Multi-step operations pass the same `UnitOfWork` to every step, so partial
//! writes can never be committed.
//!
//! # Locking
//!
//! The connection lives behind a `Mutex` and each transaction holds it for its full span, using
//! `BEGIN IMMEDIATE` so concurrent writers serialize on the database rather than failing late.
//! A request that panics mid-transaction poisons the mutex; the next caller takes the lock back
//! and rolls back anything the dropped transaction left open.

use crate::constants::SQLITE_BUSY_TIMEOUT;
use crate::{PatientError, PatientResult};
use rusqlite::{Connection, OptionalExtension, Params, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    id_card TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patient (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title_name TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    id_card TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL,
    gender TEXT NOT NULL,
    date_birth TEXT NOT NULL,
    house_number TEXT NOT NULL DEFAULT '',
    street TEXT NOT NULL DEFAULT '',
    village TEXT NOT NULL DEFAULT '',
    subdistrict TEXT NOT NULL DEFAULT '',
    district TEXT NOT NULL DEFAULT '',
    province TEXT NOT NULL DEFAULT '',
    weight REAL NOT NULL,
    height REAL NOT NULL,
    waist REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS health_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patient(id),
    bmi REAL NOT NULL,
    waist_to_height_ratio REAL NOT NULL,
    record_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_health_data_patient
    ON health_data(patient_id, record_date DESC);

CREATE TABLE IF NOT EXISTS password_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    patient_id INTEGER NOT NULL REFERENCES patient(id),
    changed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    program_name TEXT NOT NULL,
    result_program TEXT,
    appointment_date TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_user_date
    ON appointments(user_id, appointment_date);
";

/// Shared handle to the SQLite database.
pub struct Database {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Opens (creating if needed) the database file at `path`.
    ///
    /// The schema is not touched; call [`Database::migrate`] once at startup.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::Database` if the file cannot be opened or configured.
    pub fn open(path: impl AsRef<Path>) -> PatientResult<Self> {
        let conn = Connection::open(path)?;
        Self::configure(conn)
    }

    /// Opens a private in-memory database with the schema applied.
    pub fn open_in_memory() -> PatientResult<Self> {
        let db = Self::configure(Connection::open_in_memory()?)?;
        db.migrate()?;
        Ok(db)
    }

    fn configure(conn: Connection) -> PatientResult<Self> {
        conn.busy_timeout(SQLITE_BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates any missing tables and indexes. Safe to run on every start.
    pub fn migrate(&self) -> PatientResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("database schema is up to date");
        Ok(())
    }

    /// Round-trips a trivial query; used by the health endpoint.
    pub fn ping(&self) -> PatientResult<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Runs `work` inside one transaction.
    ///
    /// The transaction commits only if `work` returns `Ok`; otherwise it is rolled back when the
    /// underlying `rusqlite::Transaction` is dropped, and the error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, or `PatientError::Database` if the transaction cannot be
    /// started or committed.
    pub fn with_transaction<T>(
        &self,
        work: impl FnOnce(&UnitOfWork<'_>) -> PatientResult<T>,
    ) -> PatientResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let uow = UnitOfWork { tx };

        match work(&uow) {
            Ok(value) => {
                uow.tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("rolling back transaction: {}", e);
                Err(e)
            }
        }
    }

    fn lock(&self) -> PatientResult<MutexGuard<'_, Connection>> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering storage lock after a panicked request");
            self.conn.clear_poison();
            poisoned.into_inner()
        });
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(conn)
    }
}

/// One open transaction.
///
/// Wraps the storage contract used by the services: `execute`, `insert`, `query_one`,
/// `query_optional` and `query_many`.
pub struct UnitOfWork<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl UnitOfWork<'_> {
    /// Executes a statement and returns the number of rows affected.
    pub fn execute(&self, sql: &str, params: impl Params) -> PatientResult<usize> {
        Ok(self.tx.execute(sql, params)?)
    }

    /// Executes an `INSERT` and returns the generated row id.
    pub fn insert(&self, sql: &str, params: impl Params) -> PatientResult<i64> {
        self.tx.execute(sql, params)?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Returns exactly one mapped row, or `PatientError::NotFound(what)` if there is none.
    pub fn query_one<T>(
        &self,
        sql: &str,
        params: impl Params,
        what: &str,
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> PatientResult<T> {
        self.query_optional(sql, params, map)?
            .ok_or_else(|| PatientError::not_found(what))
    }

    /// Returns the first mapped row, if any.
    pub fn query_optional<T>(
        &self,
        sql: &str,
        params: impl Params,
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> PatientResult<Option<T>> {
        Ok(self.tx.query_row(sql, params, map).optional()?)
    }

    /// Returns every mapped row in query order.
    pub fn query_many<T>(
        &self,
        sql: &str,
        params: impl Params,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> PatientResult<Vec<T>> {
        let mut stmt = self.tx.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
