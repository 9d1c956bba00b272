//! Represents a tracked belonging and the payloads used to create or edit one.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier assigned by the store when an item is created.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Mint a fresh identifier. UUIDv4 keeps ids unique for the store's lifetime.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to an attached photo, minted by a `PhotoResolver`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhotoRef(String);

impl PhotoRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single tracked belonging.
///
/// Field names serialize in camelCase; this is the shape of the persisted
/// record and of the HTTP API.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Store-assigned identifier, stable across updates.
    pub id: ItemId,

    /// What was lost. Search matches against this.
    pub item_name: String,

    /// Where it was last seen.
    pub location: String,

    /// Free-form notes; empty when not given.
    #[serde(default)]
    pub additional_info: String,

    /// Attached photo, if any.
    #[serde(default)]
    pub photo_ref: Option<PhotoRef>,

    /// Set once at creation.
    pub created_at: DateTime<Utc>,

    /// Equal to `created_at` until the first update.
    pub updated_at: DateTime<Utc>,
}

/// User-entered fields for an add or edit submission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemDraft {
    pub item_name: String,
    pub location: String,
    pub additional_info: String,
}

impl ItemDraft {
    pub fn new(
        item_name: impl Into<String>,
        location: impl Into<String>,
        additional_info: impl Into<String>,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            location: location.into(),
            additional_info: additional_info.into(),
        }
    }
}

/// Raw image bytes as received from the user, before a resolver stores them.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoUpload {
    /// Declared MIME type, e.g. `image/jpeg`.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl PhotoUpload {
    pub fn new(content_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }
}

/// What an update does to the item's photo.
#[derive(Clone, Debug, PartialEq)]
pub enum PhotoAction {
    /// Leave the current photo (or lack of one) untouched.
    Keep,
    /// Release the current photo, if any, and attach this one.
    Replace(PhotoUpload),
    /// Release the current photo and leave the item without one.
    Remove,
}
