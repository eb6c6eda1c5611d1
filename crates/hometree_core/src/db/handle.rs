//! Shared database handle with scoped connection and transaction access.
//!
//! # Responsibility
//! - Own the migrated SQLite connection for the lifetime of the process.
//! - Serialize access so each engine call sees one consistent transaction.
//!
//! # Invariants
//! - Write closures run inside `BEGIN IMMEDIATE`; they commit only on `Ok`.
//! - The connection lock is released on every exit path, including errors
//!   and unwinding (guard + transaction are dropped, which rolls back).

use super::{open_db, open_db_in_memory, DbError, DbResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

const MEMORY_TARGET: &str = ":memory:";

/// Storage connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    /// SQLite database file, created when missing.
    File(PathBuf),
    /// Private in-memory database, discarded on shutdown.
    Memory,
}

impl DbTarget {
    /// Parses a connection target; `:memory:` selects the in-memory store.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed == MEMORY_TARGET {
            Self::Memory
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

impl Display for DbTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, "{MEMORY_TARGET}"),
        }
    }
}

/// Cloneable handle to the process-wide connection.
///
/// Passed explicitly to the integrity engine; there is no global handle.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens and migrates the database behind `target`.
    pub fn open(target: &DbTarget) -> DbResult<Self> {
        let conn = match target {
            DbTarget::File(path) => open_db(path)?,
            DbTarget::Memory => open_db_in_memory()?,
        };
        Ok(Self::from_connection(conn))
    }

    /// Opens a fresh, migrated in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DbTarget::Memory)
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with shared access to the connection (no transaction).
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let guard = self.lock()?;
        f(&guard)
    }

    /// Runs `f` with exclusive mutable access, for maintenance tasks such as
    /// [`super::reset_database`].
    pub fn with_connection_mut<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut guard = self.lock()?;
        f(&mut guard)
    }

    /// Runs `f` inside one immediate write transaction.
    ///
    /// Commits when `f` returns `Ok`; any error from `f` or from the commit
    /// itself (for example a deferred foreign key failure) rolls back.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> DbResult<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }
}
