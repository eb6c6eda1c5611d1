//! Core domain logic for hometree.
//! This crate is the single source of truth for referential integrity and
//! cascade policy across users, houses, rooms and devices.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{Database, DbError, DbTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{
    Device, DevicePatch, Entity, EntityPatchError, EntityValidationError, House, HousePatch, Room,
    RoomPatch, User, UserPatch,
};
pub use model::relation::{ChildPolicy, EntityKind};
pub use repo::entity_repo::{
    EntityListQuery, EntityStore, RepoError, RepoResult, SqliteEntityStore,
};
pub use service::integrity::{DeleteOutcome, EngineError, EngineResult, IntegrityEngine};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
