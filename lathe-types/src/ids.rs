//! Identifier types used throughout lathe.
//!
//! Freshly built entities get a UUID v7 key, which embeds a timestamp for
//! natural ordering. Blueprints and stores may replace it with any other
//! non-empty key (document stores use hex object ids, relational stores use
//! row numbers).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an entity built by a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new entity ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Creates an entity ID from a numeric row key.
    #[must_use]
    pub fn from_row(row: i64) -> Self {
        Self(row.to_string())
    }

    /// Parses an entity ID, rejecting empty or blank keys.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() != s.len() {
            return Err(Error::InvalidId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the key as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key as a row number when it is the canonical text of one.
    ///
    /// Keys such as `"007"` or `"+5"` are not row numbers.
    #[must_use]
    pub fn as_row(&self) -> Option<i64> {
        let row: i64 = self.0.parse().ok()?;
        (row.to_string() == self.0).then_some(row)
    }

    /// Returns the key as a UUID when it is one.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.0).ok()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
