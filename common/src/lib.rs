//! Exchange domain definitions
//!
//! Storage-independent types shared by the ledger, the token service and the
//! HTTP layer: trades and their item role tags, user roles, catalog items and
//! the boundary rules for identifiers.

mod trade;

pub use trade::{validate_item_sets, Trade, TradeStatus};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid identifier '{0}'")]
    InvalidId(String),

    #[error("unknown item role tag '{0}'")]
    UnknownItemRole(String),

    #[error("unknown user role '{0}'")]
    UnknownUserRole(String),

    #[error("unknown trade status '{0}'")]
    UnknownTradeStatus(String),

    #[error("item {0} is both offered and requested")]
    OverlappingItem(Uuid),

    #[error("item {0} is listed more than once")]
    DuplicateItem(Uuid),
}

/// Parses a canonical 128-bit identifier rendered as a string.
///
/// Only the hyphenated form is accepted at the boundary; braced, URN and
/// simple forms are rejected so that ids round-trip byte for byte.
pub fn parse_id(raw: &str) -> Result<Uuid, DomainError> {
    let trimmed = raw.trim();
    if trimmed.len() != 36 {
        return Err(DomainError::InvalidId(raw.to_string()));
    }
    Uuid::parse_str(trimmed).map_err(|_| DomainError::InvalidId(raw.to_string()))
}

/// Parses every id in `raws`, failing on the first malformed one.
pub fn parse_ids<S: AsRef<str>>(raws: &[S]) -> Result<Vec<Uuid>, DomainError> {
    raws.iter().map(|raw| parse_id(raw.as_ref())).collect()
}

/// Classifier of an item inside a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemRole {
    Offered,
    Requested,
}

impl ItemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemRole::Offered => "offered",
            ItemRole::Requested => "requested",
        }
    }
}

impl FromStr for ItemRole {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "offered" => Ok(ItemRole::Offered),
            "requested" => Ok(ItemRole::Requested),
            other => Err(DomainError::UnknownItemRole(other.to_string())),
        }
    }
}

impl fmt::Display for ItemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role snapshot carried by a user record and by every issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            other => Err(DomainError::UnknownUserRole(other.to_string())),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tradable virtual item from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub rarity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Public view of a registered user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
