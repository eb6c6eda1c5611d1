//! Entity records, update patches and field validation.
//!
//! # Responsibility
//! - Define the canonical shape of every entity (also its JSON shape).
//! - Apply update patches and reject identity changes that are not allowed.
//!
//! # Invariants
//! - Every entity is identified by its natural key; there are no surrogate ids.
//! - Keys and attributes are never blank.
//! - A user email is never changed by a patch.

use super::relation::EntityKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    /// A key or attribute is empty or whitespace only.
    BlankField {
        kind: EntityKind,
        field: &'static str,
    },
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { kind, field } => write!(f, "{kind} {field} must not be blank"),
        }
    }
}

impl Error for EntityValidationError {}

/// Patch application failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityPatchError {
    /// The patch tries to change a field that identifies the entity.
    ImmutableKey {
        kind: EntityKind,
        field: &'static str,
    },
}

impl Display for EntityPatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImmutableKey { kind, field } => {
                write!(f, "{kind} {field} cannot be changed")
            }
        }
    }
}

impl Error for EntityPatchError {}

/// Common contract of the four persisted entity types.
///
/// Every entity is stored as two text columns: its natural key and one
/// attribute. For children the attribute is the parent's natural key.
pub trait Entity: Clone + Debug + PartialEq + Send + 'static {
    /// Partial update accepted by [`Entity::patched`].
    type Patch: Debug + Send + 'static;

    const KIND: EntityKind;

    fn key(&self) -> &str;

    fn attribute(&self) -> &str;

    /// Rebuilds an entity from its stored columns.
    fn from_columns(key: String, attribute: String) -> Self;

    /// Natural key of the parent entity, `None` for roots.
    fn parent_key(&self) -> Option<&str> {
        Self::KIND.parent().map(|_| self.attribute())
    }

    /// Checks field-level invariants.
    fn validate(&self) -> Result<(), EntityValidationError> {
        ensure_not_blank(Self::KIND, Self::KIND.key_field(), self.key())?;
        ensure_not_blank(Self::KIND, Self::KIND.attribute_field(), self.attribute())?;
        Ok(())
    }

    /// Returns the record that results from applying `patch` to `self`.
    ///
    /// Missing or blank patch fields keep their current value. This does not check
    /// uniqueness or parent existence; the engine does that.
    fn patched(&self, patch: Self::Patch) -> Result<Self, EntityPatchError>;
}

/// Account owning houses, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
}

/// Update payload for a user. Only `name` may change; `email` is accepted
/// for compatibility but must equal the current email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

impl Entity for User {
    type Patch = UserPatch;

    const KIND: EntityKind = EntityKind::User;

    fn key(&self) -> &str {
        &self.email
    }

    fn attribute(&self) -> &str {
        &self.name
    }

    fn from_columns(key: String, attribute: String) -> Self {
        Self {
            email: key,
            name: attribute,
        }
    }

    fn patched(&self, patch: UserPatch) -> Result<Self, EntityPatchError> {
        if let Some(email) = provided(patch.email) {
            if email != self.email {
                return Err(EntityPatchError::ImmutableKey {
                    kind: Self::KIND,
                    field: "email",
                });
            }
        }

        Ok(Self {
            email: self.email.clone(),
            name: keep_or_replace(&self.name, patch.name),
        })
    }
}

/// Property owned by one user, keyed by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub address: String,
    pub user_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HousePatch {
    pub address: Option<String>,
    pub user_email: Option<String>,
}

impl House {
    pub fn new(address: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user_email: user_email.into(),
        }
    }
}

impl Entity for House {
    type Patch = HousePatch;

    const KIND: EntityKind = EntityKind::House;

    fn key(&self) -> &str {
        &self.address
    }

    fn attribute(&self) -> &str {
        &self.user_email
    }

    fn from_columns(key: String, attribute: String) -> Self {
        Self {
            address: key,
            user_email: attribute,
        }
    }

    fn patched(&self, patch: HousePatch) -> Result<Self, EntityPatchError> {
        Ok(Self {
            address: keep_or_replace(&self.address, patch.address),
            user_email: keep_or_replace(&self.user_email, patch.user_email),
        })
    }
}

/// Room inside a house, keyed by a globally unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    #[serde(alias = "house_adrs")]
    pub house_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomPatch {
    pub name: Option<String>,
    #[serde(alias = "house_adrs")]
    pub house_address: Option<String>,
}

impl Room {
    pub fn new(name: impl Into<String>, house_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            house_address: house_address.into(),
        }
    }
}

impl Entity for Room {
    type Patch = RoomPatch;

    const KIND: EntityKind = EntityKind::Room;

    fn key(&self) -> &str {
        &self.name
    }

    fn attribute(&self) -> &str {
        &self.house_address
    }

    fn from_columns(key: String, attribute: String) -> Self {
        Self {
            name: key,
            house_address: attribute,
        }
    }

    fn patched(&self, patch: RoomPatch) -> Result<Self, EntityPatchError> {
        Ok(Self {
            name: keep_or_replace(&self.name, patch.name),
            house_address: keep_or_replace(&self.house_address, patch.house_address),
        })
    }
}

/// Device installed in a room, keyed by a globally unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub room_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub room_name: Option<String>,
}

impl Device {
    pub fn new(name: impl Into<String>, room_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room_name: room_name.into(),
        }
    }
}

impl Entity for Device {
    type Patch = DevicePatch;

    const KIND: EntityKind = EntityKind::Device;

    fn key(&self) -> &str {
        &self.name
    }

    fn attribute(&self) -> &str {
        &self.room_name
    }

    fn from_columns(key: String, attribute: String) -> Self {
        Self {
            name: key,
            room_name: attribute,
        }
    }

    fn patched(&self, patch: DevicePatch) -> Result<Self, EntityPatchError> {
        Ok(Self {
            name: keep_or_replace(&self.name, patch.name),
            room_name: keep_or_replace(&self.room_name, patch.room_name),
        })
    }
}

fn ensure_not_blank(
    kind: EntityKind,
    field: &'static str,
    value: &str,
) -> Result<(), EntityValidationError> {
    if value.trim().is_empty() {
        return Err(EntityValidationError::BlankField { kind, field });
    }
    Ok(())
}

/// Patch field with blank values treated as absent.
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn keep_or_replace(current: &str, value: Option<String>) -> String {
    provided(value).unwrap_or_else(|| current.to_string())
}
