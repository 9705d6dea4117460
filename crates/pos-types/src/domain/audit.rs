use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order::{OrderId, UserId};
use crate::domain::status::{OrderStatus, StoredStatus};

/// Actor id recorded for changes made by the system itself.
pub const SYSTEM_USER_ID: UserId = 0;

/// Where a status change originated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Pos,
    Kds,
    Api,
    System,
    Tracking,
    Rider,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Pos => "pos",
            Source::Kds => "kds",
            Source::Api => "api",
            Source::System => "system",
            Source::Tracking => "tracking",
            Source::Rider => "rider",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pos" => Ok(Source::Pos),
            "kds" => Ok(Source::Kds),
            "api" => Ok(Source::Api),
            "system" => Ok(Source::System),
            "tracking" => Ok(Source::Tracking),
            "rider" => Ok(Source::Rider),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// One row of the append-only status audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusAuditRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub status_from: StoredStatus,
    pub status_to: OrderStatus,
    pub source: Source,
    pub actor_user_id: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAuditRecord {
    pub order_id: OrderId,
    pub status_from: StoredStatus,
    pub status_to: OrderStatus,
    pub source: Source,
    pub actor_user_id: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewAuditRecord {
    pub fn into_record(self, id: i64) -> StatusAuditRecord {
        StatusAuditRecord {
            id,
            order_id: self.order_id,
            status_from: self.status_from,
            status_to: self.status_to,
            source: self.source,
            actor_user_id: self.actor_user_id,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}
