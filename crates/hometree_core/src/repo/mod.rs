//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the entity store contract used by the integrity engine.
//! - Isolate SQLite query details from engine orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Entity::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateKey`) in
//!   addition to DB transport errors.

pub mod entity_repo;
