pub mod appointments;
pub mod availability;
pub mod sms;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const MIGRATION_001: &str = include_str!("migrations/001_initial.sql");

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(MIGRATION_001)
            .context("Failed to run migration 001")?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database connection lock poisoned"))
    }

    /// Run `f` against the connection outside an explicit transaction. Each
    /// statement commits on its own.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside an immediate (write-locking) transaction. Commits when
    /// `f` returns `Ok`, rolls back otherwise.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: From<anyhow::Error>,
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin transaction")?;

        // Dropping the transaction without committing rolls it back
        let value = f(&tx)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }
}

/// Unix seconds back to an instant
pub(crate) fn instant(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
