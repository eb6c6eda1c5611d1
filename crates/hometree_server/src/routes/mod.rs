//! Route definitions.

pub mod entities;
pub mod health;
