//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate entity store calls into validated use-case APIs.
//! - Keep HTTP and CLI layers decoupled from storage details.

pub mod integrity;
