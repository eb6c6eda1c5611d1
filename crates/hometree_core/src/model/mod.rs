//! Domain model for the User -> House -> Room -> Device hierarchy.
//!
//! # Responsibility
//! - Define the canonical entity records shared by store, engine and HTTP.
//! - Describe the parent/child links and their delete policies.
//!
//! # Invariants
//! - Entities are identified by natural keys only.
//! - Ownership is relational (a parent key column), never a pointer.

pub mod entity;
pub mod relation;
