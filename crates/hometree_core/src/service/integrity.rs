//! Referential-integrity and cascade-policy engine.
//!
//! # Responsibility
//! - Validate parent existence before inserts and parent changes.
//! - Validate natural-key renames and re-point children to the new key.
//! - Apply the per-relationship delete policy (cascade or orphan).
//!
//! # Invariants
//! - Validation is parent-then-self: a child is never written pointing at a
//!   missing parent.
//! - Every operation runs in one scoped transaction; check-then-act
//!   sequences cannot interleave with another writer.
//! - A user email never changes.
//! - Storage constraint failures that slip past these checks are reported as
//!   `Storage`, never reinterpreted (primary-key collisions excepted, which
//!   are the final arbiter for `DuplicateKey`).

use crate::db::{Database, DbError};
use crate::model::entity::{Entity, EntityPatchError, EntityValidationError};
use crate::model::relation::{ChildPolicy, EntityKind};
use crate::repo::entity_repo::{EntityListQuery, EntityStore, RepoError, SqliteEntityStore};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from integrity engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// A field failed validation.
    Validation(EntityValidationError),
    /// Target entity does not exist.
    NotFound { kind: EntityKind, key: String },
    /// Referenced parent does not exist. `kind` is the parent kind.
    ParentNotFound { kind: EntityKind, key: String },
    /// Natural key already taken by another entity of the same kind.
    DuplicateKey { kind: EntityKind, key: String },
    /// Attempted change of an identity field that must not change.
    ImmutableKey {
        kind: EntityKind,
        field: &'static str,
    },
    /// Unexpected storage failure.
    Storage(RepoError),
}

impl EngineError {
    /// Stable snake_case code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::ParentNotFound { .. } => "parent_not_found",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::ImmutableKey { .. } => "immutable_key",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, key } => write!(f, "{kind} not found: {key}"),
            Self::ParentNotFound { kind, key } => {
                write!(f, "referenced {kind} not found: {key}")
            }
            Self::DuplicateKey { kind, key } => write!(f, "{kind} already exists: {key}"),
            Self::ImmutableKey { kind, field } => write!(f, "{kind} {field} cannot be changed"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { kind, key } => Self::NotFound { kind, key },
            RepoError::DuplicateKey { kind, key } => Self::DuplicateKey { kind, key },
            other => Self::Storage(other),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::Storage(RepoError::from(value))
    }
}

impl From<EntityValidationError> for EngineError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<EntityPatchError> for EngineError {
    fn from(value: EntityPatchError) -> Self {
        match value {
            EntityPatchError::ImmutableKey { kind, field } => Self::ImmutableKey { kind, field },
        }
    }
}

/// Result of a delete: the removed record plus its affected descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome<E> {
    pub entity: E,
    /// Descendants removed by cascade, at every level.
    pub cascaded: usize,
    /// Children left in place with a dangling parent reference.
    pub orphaned: usize,
}

#[derive(Debug, Default)]
struct PolicyReport {
    cascaded: usize,
    orphaned: usize,
}

/// Integrity engine over an explicit database handle.
#[derive(Debug, Clone)]
pub struct IntegrityEngine {
    db: Database,
}

impl IntegrityEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates one entity after checking its parent and its key.
    ///
    /// # Errors
    /// - `ParentNotFound` when the referenced parent is absent. This wins over
    ///   field validation, so a blank parent key is reported as missing.
    /// - `Validation` for blank fields.
    /// - `DuplicateKey` when the natural key is taken.
    pub fn create<E: Entity>(&self, entity: E) -> EngineResult<E> {
        let started_at = Instant::now();
        let result = self.db.with_transaction(|tx| {
            let store = SqliteEntityStore::try_new(tx)?;
            create_checked(&store, &entity)
        });
        log_outcome("entity_create", E::KIND, started_at, &result);
        result.map(|()| entity)
    }

    /// Loads one entity by natural key.
    pub fn read<E: Entity>(&self, key: &str) -> EngineResult<E> {
        self.db.with_connection(|conn| {
            let store = SqliteEntityStore::try_new(conn)?;
            store
                .find_by_key::<E>(key)?
                .ok_or_else(|| EngineError::NotFound {
                    kind: E::KIND,
                    key: key.to_string(),
                })
        })
    }

    /// Lists entities in insertion order within an offset/limit window.
    pub fn list<E: Entity>(&self, query: &EntityListQuery) -> EngineResult<Vec<E>> {
        self.db.with_connection(|conn| {
            let store = SqliteEntityStore::try_new(conn)?;
            store.list::<E>(query).map_err(Into::into)
        })
    }

    /// Applies `patch` to the entity stored under `key`.
    ///
    /// # Contract
    /// - Missing patch fields keep their current value.
    /// - A changed key must be free; children are re-pointed to it.
    /// - A changed parent reference must resolve. An unchanged one is not
    ///   re-checked, so orphaned rooms stay editable.
    pub fn update<E: Entity>(&self, key: &str, patch: E::Patch) -> EngineResult<E> {
        let started_at = Instant::now();
        let result = self.db.with_transaction(|tx| {
            let store = SqliteEntityStore::try_new(tx)?;
            update_checked::<_, E>(&store, key, patch)
        });
        log_outcome("entity_update", E::KIND, started_at, &result);
        result
    }

    /// Deletes one entity and applies the delete policy to its children.
    pub fn delete<E: Entity>(&self, key: &str) -> EngineResult<DeleteOutcome<E>> {
        let started_at = Instant::now();
        let result = self.db.with_transaction(|tx| {
            let store = SqliteEntityStore::try_new(tx)?;
            if !store.exists(E::KIND, key)? {
                return Err(EngineError::NotFound {
                    kind: E::KIND,
                    key: key.to_string(),
                });
            }

            let mut report = PolicyReport::default();
            apply_child_policy(&store, E::KIND, key, &mut report)?;
            let entity = store.delete::<E>(key)?;
            Ok(DeleteOutcome {
                entity,
                cascaded: report.cascaded,
                orphaned: report.orphaned,
            })
        });

        if let Ok(outcome) = &result {
            info!(
                "event=entity_delete module=integrity status=ok kind={} cascaded={} orphaned={} duration_ms={}",
                E::KIND,
                outcome.cascaded,
                outcome.orphaned,
                started_at.elapsed().as_millis()
            );
        } else {
            log_outcome("entity_delete", E::KIND, started_at, &result);
        }
        result
    }
}

fn create_checked<S: EntityStore, E: Entity>(store: &S, entity: &E) -> EngineResult<()> {
    ensure_parent_exists(store, entity)?;
    entity.validate()?;

    if store.exists(E::KIND, entity.key())? {
        return Err(EngineError::DuplicateKey {
            kind: E::KIND,
            key: entity.key().to_string(),
        });
    }

    store.insert(entity)?;
    Ok(())
}

fn update_checked<S: EntityStore, E: Entity>(
    store: &S,
    key: &str,
    patch: E::Patch,
) -> EngineResult<E> {
    let current = store
        .find_by_key::<E>(key)?
        .ok_or_else(|| EngineError::NotFound {
            kind: E::KIND,
            key: key.to_string(),
        })?;

    let next = current.patched(patch)?;
    next.validate()?;

    let renamed = next.key() != current.key();
    if renamed && store.exists(E::KIND, next.key())? {
        return Err(EngineError::DuplicateKey {
            kind: E::KIND,
            key: next.key().to_string(),
        });
    }

    if next.parent_key() != current.parent_key() {
        ensure_parent_exists(store, &next)?;
    }

    store.update(current.key(), &next)?;

    if renamed {
        if let Some((child, _)) = E::KIND.child() {
            let moved = store.reparent_children(child, current.key(), next.key())?;
            debug!(
                "event=entity_rename module=integrity kind={} child_kind={} repointed={}",
                E::KIND,
                child,
                moved
            );
        }
    }

    Ok(next)
}

fn ensure_parent_exists<S: EntityStore, E: Entity>(store: &S, entity: &E) -> EngineResult<()> {
    if let (Some(parent_kind), Some(parent_key)) = (E::KIND.parent(), entity.parent_key()) {
        if !store.exists(parent_kind, parent_key)? {
            return Err(EngineError::ParentNotFound {
                kind: parent_kind,
                key: parent_key.to_string(),
            });
        }
    }
    Ok(())
}

/// Applies `kind`'s child policy below `key`, depth first.
///
/// Cascaded children apply their own policy first, so deleting a user removes
/// its houses while the rooms of those houses are orphaned.
fn apply_child_policy<S: EntityStore>(
    store: &S,
    kind: EntityKind,
    key: &str,
    report: &mut PolicyReport,
) -> EngineResult<()> {
    let Some((child, policy)) = kind.child() else {
        return Ok(());
    };

    match policy {
        ChildPolicy::Cascade => {
            for child_key in store.child_keys(child, key)? {
                apply_child_policy(store, child, &child_key, report)?;
            }
            report.cascaded += store.delete_children(child, key)?;
        }
        ChildPolicy::Orphan => {
            report.orphaned += store.child_keys(child, key)?.len();
        }
    }
    Ok(())
}

fn log_outcome<T>(
    event: &'static str,
    kind: EntityKind,
    started_at: Instant,
    result: &EngineResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={} module=integrity status=ok kind={} duration_ms={}",
            event, kind, duration_ms
        ),
        Err(EngineError::Storage(err)) => warn!(
            "event={} module=integrity status=error kind={} duration_ms={} error_code=storage_error error={}",
            event, kind, duration_ms, err
        ),
        Err(err) => info!(
            "event={} module=integrity status=rejected kind={} duration_ms={} error_code={}",
            event,
            kind,
            duration_ms,
            err.code()
        ),
    }
}
