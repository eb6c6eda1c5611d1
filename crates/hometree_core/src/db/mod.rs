//! SQLite storage bootstrap, schema migrations and the shared handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for hometree core.
//! - Apply schema migrations in deterministic order.
//! - Hand out scoped connection/transaction access to the engine.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write entity data before migrations succeed.
//! - Foreign keys are enforced on every connection.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod handle;
pub mod migrations;
mod open;

pub use handle::{Database, DbTarget};
pub use open::{open_db, open_db_in_memory, reset_database};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A previous holder of the connection panicked mid-operation.
    LockPoisoned,
}

impl DbError {
    /// Returns the SQLite constraint message when this error is a constraint
    /// violation (unique, foreign key, trigger abort).
    pub fn constraint_message(&self) -> Option<String> {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, message))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Some(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => None,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::LockPoisoned => write!(f, "database connection lock poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::LockPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
