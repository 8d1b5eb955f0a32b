use crate::error::{validation, InventoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Categories offered by the add-item form. Stores never enforce them.
pub const STANDARD_CATEGORIES: [&str; 6] = [
    "Food",
    "Drinks",
    "Supplies",
    "Electronics",
    "Clothing",
    "Furniture",
];

/// Document key of an inventory item. The name is the only identifier an item has.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct ItemName(pub String);

impl ItemName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying key as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ItemName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stored body of an item document. The key lives outside the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ItemDocument {
    pub category: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ItemDocument {
    /// Body written on the first add of a name.
    pub fn fresh(category: impl Into<String>, image: Option<String>) -> Self {
        Self {
            category: category.into(),
            quantity: 1,
            image,
        }
    }

    /// Same document with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Rejects bodies that must never be persisted.
    ///
    /// A zero quantity is never stored: reaching zero deletes the document instead.
    pub fn ensure_storable(&self) -> InventoryResult<()> {
        if self.quantity == 0 {
            return Err(validation("quantity must be at least 1"));
        }
        Ok(())
    }
}

/// One row of the materialized inventory list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct InventoryItem {
    pub name: ItemName,
    pub category: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl InventoryItem {
    /// Builds a list row from a document and the key it was stored under.
    pub fn from_document(name: ItemName, doc: ItemDocument) -> Self {
        Self {
            name,
            category: doc.category,
            quantity: doc.quantity,
            image: doc.image,
        }
    }

    pub fn document(&self) -> ItemDocument {
        ItemDocument {
            category: self.category.clone(),
            quantity: self.quantity,
            image: self.image.clone(),
        }
    }
}

/// Write stamp of a document. Stores draw it from one store-wide counter, so a value is
/// never reused for a name, even after the document is deleted and created again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    /// First revision a fresh store hands out.
    pub const fn initial() -> Self {
        Self(1)
    }

    /// Sentinel revision of an absent document.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Returns the raw counter.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Produces the next revision.
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Revision> for u64 {
    fn from(revision: Revision) -> Self {
        revision.0
    }
}

/// Identifier assigned to an account by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the raw UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: UserId,
    pub email: String,
    pub signed_in_at: OffsetDateTime,
}

/// Authentication state observed by the session gate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    SignedOut,
    SignedIn(UserIdentity),
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }

    /// Returns the signed-in user, if any.
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            SessionState::SignedIn(user) => Some(user),
            SessionState::SignedOut => None,
        }
    }
}
