//! Entity store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD primitives over the `users`, `houses`, `rooms` and
//!   `devices` tables, generic over [`Entity`].
//! - Translate storage constraint failures into semantic errors.
//!
//! # Invariants
//! - Write paths call `Entity::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Primary-key/unique violations surface as `DuplicateKey`; every other
//!   constraint failure surfaces as `Constraint` and is never reinterpreted.
//! - Listing order is insertion order (`rowid`).

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::entity::{Entity, EntityValidationError};
use crate::model::relation::EntityKind;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const LIST_DEFAULT_LIMIT: u32 = 10;
const LIST_LIMIT_MAX: u32 = 100;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntityValidationError),
    Db(DbError),
    NotFound {
        kind: EntityKind,
        key: String,
    },
    /// Natural key already taken; raised by the primary-key constraint.
    DuplicateKey {
        kind: EntityKind,
        key: String,
    },
    /// Any other storage constraint (foreign key, guard trigger).
    Constraint(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, key } => write!(f, "{kind} not found: {key}"),
            Self::DuplicateKey { kind, key } => write!(f, "{kind} already exists: {key}"),
            Self::Constraint(message) => write!(f, "storage constraint violated: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "entity store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted entity data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntityValidationError> for RepoError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value.constraint_message() {
            Some(message) => Self::Constraint(message),
            None => Self::Db(value),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Default)]
pub struct EntityListQuery {
    pub offset: u32,
    pub limit: Option<u32>,
}

impl EntityListQuery {
    pub fn new(offset: u32, limit: Option<u32>) -> Self {
        Self { offset, limit }
    }

    /// Effective limit: default 10, `0` means default, capped at 100.
    pub fn applied_limit(&self) -> u32 {
        match self.limit {
            // An explicit `limit=0` falls back to the default instead of an empty page.
            Some(0) | None => LIST_DEFAULT_LIMIT,
            Some(value) if value > LIST_LIMIT_MAX => LIST_LIMIT_MAX,
            Some(value) => value,
        }
    }
}

/// Storage primitives used by the integrity engine.
///
/// Implementations enforce uniqueness and references as a backstop only;
/// callers are expected to validate before writing.
pub trait EntityStore {
    /// Inserts a new record.
    fn insert<E: Entity>(&self, entity: &E) -> RepoResult<()>;
    /// Loads one record by natural key.
    fn find_by_key<E: Entity>(&self, key: &str) -> RepoResult<Option<E>>;
    /// Replaces the record stored under `key`, key column included.
    fn update<E: Entity>(&self, key: &str, entity: &E) -> RepoResult<()>;
    /// Deletes one record; storage-level cascades apply.
    fn delete<E: Entity>(&self, key: &str) -> RepoResult<E>;
    /// Lists records in insertion order.
    fn list<E: Entity>(&self, query: &EntityListQuery) -> RepoResult<Vec<E>>;
    /// Returns whether a record of `kind` exists under `key`.
    fn exists(&self, kind: EntityKind, key: &str) -> RepoResult<bool>;
    /// Lists keys of `child` records referencing `parent_key`.
    fn child_keys(&self, child: EntityKind, parent_key: &str) -> RepoResult<Vec<String>>;
    /// Deletes all `child` records referencing `parent_key`.
    fn delete_children(&self, child: EntityKind, parent_key: &str) -> RepoResult<usize>;
    /// Re-points all `child` records from `old_parent_key` to `new_parent_key`.
    fn reparent_children(
        &self,
        child: EntityKind,
        old_parent_key: &str,
        new_parent_key: &str,
    ) -> RepoResult<usize>;
}

/// SQLite-backed entity store.
///
/// Borrowing a `Transaction` works through deref, which is how the engine
/// scopes a whole operation to one transaction.
pub struct SqliteEntityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityStore<'conn> {
    /// Creates a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl EntityStore for SqliteEntityStore<'_> {
    fn insert<E: Entity>(&self, entity: &E) -> RepoResult<()> {
        entity.validate()?;

        let kind = E::KIND;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} ({}, {}) VALUES (?1, ?2);",
                    kind.table(),
                    kind.key_field(),
                    kind.attribute_field()
                ),
                params![entity.key(), entity.attribute()],
            )
            .map_err(|err| map_write_error(kind, entity.key(), err))?;
        Ok(())
    }

    fn find_by_key<E: Entity>(&self, key: &str) -> RepoResult<Option<E>> {
        let kind = E::KIND;
        let columns = self
            .conn
            .query_row(
                &format!("{} WHERE {} = ?1;", select_sql(kind), kind.key_field()),
                [key],
                read_columns,
            )
            .optional()?;

        columns
            .map(|(key, attribute)| parse_entity::<E>(key, attribute))
            .transpose()
    }

    fn update<E: Entity>(&self, key: &str, entity: &E) -> RepoResult<()> {
        entity.validate()?;

        let kind = E::KIND;
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {table} SET {key_col} = ?1, {attr_col} = ?2 WHERE {key_col} = ?3;",
                    table = kind.table(),
                    key_col = kind.key_field(),
                    attr_col = kind.attribute_field()
                ),
                params![entity.key(), entity.attribute(), key],
            )
            .map_err(|err| map_write_error(kind, entity.key(), err))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn delete<E: Entity>(&self, key: &str) -> RepoResult<E> {
        let existing = self.find_by_key::<E>(key)?.ok_or_else(|| RepoError::NotFound {
            kind: E::KIND,
            key: key.to_string(),
        })?;

        self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                E::KIND.table(),
                E::KIND.key_field()
            ),
            [key],
        )?;
        Ok(existing)
    }

    fn list<E: Entity>(&self, query: &EntityListQuery) -> RepoResult<Vec<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY rowid ASC LIMIT ?1 OFFSET ?2;",
            select_sql(E::KIND)
        ))?;
        let mut rows = stmt.query(params![
            i64::from(query.applied_limit()),
            i64::from(query.offset)
        ])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let (key, attribute) = read_columns(row)?;
            items.push(parse_entity::<E>(key, attribute)?);
        }
        Ok(items)
    }

    fn exists(&self, kind: EntityKind, key: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                kind.table(),
                kind.key_field()
            ),
            [key],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn child_keys(&self, child: EntityKind, parent_key: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY rowid ASC;",
            child.key_field(),
            child.table(),
            child.attribute_field()
        ))?;
        let mut rows = stmt.query([parent_key])?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    fn delete_children(&self, child: EntityKind, parent_key: &str) -> RepoResult<usize> {
        let deleted = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                child.table(),
                child.attribute_field()
            ),
            [parent_key],
        )?;
        Ok(deleted)
    }

    fn reparent_children(
        &self,
        child: EntityKind,
        old_parent_key: &str,
        new_parent_key: &str,
    ) -> RepoResult<usize> {
        let moved = self
            .conn
            .execute(
                &format!(
                    "UPDATE {table} SET {attr_col} = ?2 WHERE {attr_col} = ?1;",
                    table = child.table(),
                    attr_col = child.attribute_field()
                ),
                params![old_parent_key, new_parent_key],
            )
            .map_err(|err| map_write_error(child, new_parent_key, err))?;
        Ok(moved)
    }
}

fn select_sql(kind: EntityKind) -> String {
    format!(
        "SELECT {} AS entity_key, {} AS entity_attribute FROM {}",
        kind.key_field(),
        kind.attribute_field(),
        kind.table()
    )
}

fn read_columns(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get("entity_key")?, row.get("entity_attribute")?))
}

fn parse_entity<E: Entity>(key: String, attribute: String) -> RepoResult<E> {
    let entity = E::from_columns(key, attribute);
    entity.validate().map_err(|err| {
        RepoError::InvalidData(format!("{} row `{}`: {err}", E::KIND, entity.key()))
    })?;
    Ok(entity)
}

fn map_write_error(kind: EntityKind, key: &str, err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation
            && matches!(
                failure.extended_code,
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
            )
        {
            return RepoError::DuplicateKey {
                kind,
                key: key.to_string(),
            };
        }
    }
    RepoError::from(err)
}
