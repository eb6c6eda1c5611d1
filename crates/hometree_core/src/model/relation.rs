//! Entity kinds and the parent/child relationship table.
//!
//! # Invariants
//! - The hierarchy is linear: User -> House -> Room -> Device.
//! - Each parent has exactly one child kind and one delete policy for it.
//! - House -> Room orphans on delete; the other two links cascade.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// The four persisted entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    House,
    Room,
    Device,
}

/// What happens to children when their parent is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildPolicy {
    /// Children are deleted together with the parent.
    Cascade,
    /// Children stay and keep the now-dangling parent reference.
    Orphan,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::User, Self::House, Self::Room, Self::Device];

    /// Lowercase singular label used in messages and log events.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::House => "house",
            Self::Room => "room",
            Self::Device => "device",
        }
    }

    /// Name of the natural-key field, as exposed over JSON.
    pub fn key_field(self) -> &'static str {
        match self {
            Self::User => "email",
            Self::House => "address",
            Self::Room | Self::Device => "name",
        }
    }

    /// Name of the non-key field, as exposed over JSON.
    pub fn attribute_field(self) -> &'static str {
        match self {
            Self::User => "name",
            Self::House => "user_email",
            Self::Room => "house_address",
            Self::Device => "room_name",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::House => "houses",
            Self::Room => "rooms",
            Self::Device => "devices",
        }
    }

    /// Kind referenced by this kind's attribute, if any.
    pub fn parent(self) -> Option<EntityKind> {
        match self {
            Self::User => None,
            Self::House => Some(Self::User),
            Self::Room => Some(Self::House),
            Self::Device => Some(Self::Room),
        }
    }

    /// Child kind and the delete policy applied to it.
    pub fn child(self) -> Option<(EntityKind, ChildPolicy)> {
        match self {
            Self::User => Some((Self::House, ChildPolicy::Cascade)),
            // Kept as-is from the original data model; probably unintended.
            Self::House => Some((Self::Room, ChildPolicy::Orphan)),
            Self::Room => Some((Self::Device, ChildPolicy::Cascade)),
            Self::Device => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
