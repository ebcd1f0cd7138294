use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DomainError, ItemRole};

/// Trade lifecycle state. Only `Pending` is produced today; the terminal
/// states are accepted when read back from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Completed => "completed",
            TradeStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(TradeStatus::Pending),
            "completed" => Ok(TradeStatus::Completed),
            "cancelled" => Ok(TradeStatus::Cancelled),
            other => Err(DomainError::UnknownTradeStatus(other.to_string())),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub offered_items: Vec<Uuid>,
    pub requested_items: Vec<Uuid>,
}

impl Trade {
    /// An empty trade header, ready to accumulate association rows.
    pub fn header(
        id: Uuid,
        user_id: Uuid,
        status: TradeStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            created_at,
            offered_items: Vec::new(),
            requested_items: Vec::new(),
        }
    }

    pub fn items_mut(&mut self, role: ItemRole) -> &mut Vec<Uuid> {
        match role {
            ItemRole::Offered => &mut self.offered_items,
            ItemRole::Requested => &mut self.requested_items,
        }
    }
}

/// Checks the creation-time invariant of a trade: no item repeats inside a
/// set and the two sets are disjoint.
pub fn validate_item_sets(offered: &[Uuid], requested: &[Uuid]) -> Result<(), DomainError> {
    let mut offered_seen = HashSet::with_capacity(offered.len());
    for id in offered {
        if !offered_seen.insert(*id) {
            return Err(DomainError::DuplicateItem(*id));
        }
    }

    let mut requested_seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if offered_seen.contains(id) {
            return Err(DomainError::OverlappingItem(*id));
        }
        if !requested_seen.insert(*id) {
            return Err(DomainError::DuplicateItem(*id));
        }
    }

    Ok(())
}
