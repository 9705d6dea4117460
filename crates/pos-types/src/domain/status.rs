//! Order status vocabulary and the rules attached to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cooking,
    Ready,
    Dispatched,
    Delivered,
    /// Legacy synonym of `Pending`, still accepted on input.
    Active,
    Completed,
    Cancelled,
    Replacement,
}

/// Lifecycle timestamp columns on an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleField {
    ConfirmedAt,
    CookingStartedAt,
    ReadyAt,
    DispatchedAt,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid order status: {0:?}")]
pub struct InvalidStatus(pub String);

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Cooking,
        OrderStatus::Ready,
        OrderStatus::Dispatched,
        OrderStatus::Delivered,
        OrderStatus::Active,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Replacement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cooking => "cooking",
            OrderStatus::Ready => "ready",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Active => "active",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Replacement => "replacement",
        }
    }

    /// The timestamp a transition *into* this status stamps.
    ///
    /// Delivery completion is recorded on the delivery row, so `Delivered`
    /// has no order-level field.
    pub fn timestamp_field(&self) -> Option<LifecycleField> {
        match self {
            OrderStatus::Confirmed => Some(LifecycleField::ConfirmedAt),
            OrderStatus::Cooking => Some(LifecycleField::CookingStartedAt),
            OrderStatus::Ready => Some(LifecycleField::ReadyAt),
            OrderStatus::Dispatched => Some(LifecycleField::DispatchedAt),
            OrderStatus::Pending
            | OrderStatus::Delivered
            | OrderStatus::Active
            | OrderStatus::Completed
            | OrderStatus::Cancelled
            | OrderStatus::Replacement => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

impl LifecycleField {
    pub fn column(&self) -> &'static str {
        match self {
            LifecycleField::ConfirmedAt => "confirmed_at",
            LifecycleField::CookingStartedAt => "cooking_started_at",
            LifecycleField::ReadyAt => "ready_at",
            LifecycleField::DispatchedAt => "dispatched_at",
        }
    }
}

impl fmt::Display for LifecycleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

pub fn is_valid_status(raw: &str) -> bool {
    raw.parse::<OrderStatus>().is_ok()
}

/// Best-effort mapping of historical and UI status strings onto the
/// closed vocabulary. Unrecognized input falls back to `Pending`, which
/// loses information; callers should log when the result differs from
/// the input.
pub fn normalize_legacy_status(raw: &str) -> OrderStatus {
    if let Ok(status) = raw.parse::<OrderStatus>() {
        return status;
    }
    match raw {
        "preparing" | "in_progress" => OrderStatus::Cooking,
        "on_the_way" | "out_for_delivery" => OrderStatus::Dispatched,
        "new" | "" => OrderStatus::Pending,
        _ => OrderStatus::Pending,
    }
}

/// Status column as found in storage.
///
/// Rows written before the vocabulary was closed may hold arbitrary
/// strings; those load as `Invalid` so they can be inspected and repaired
/// instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredStatus {
    Valid(OrderStatus),
    Invalid(String),
}

impl StoredStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<OrderStatus>() {
            Ok(status) => StoredStatus::Valid(status),
            Err(_) => StoredStatus::Invalid(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StoredStatus::Valid(status) => status.as_str(),
            StoredStatus::Invalid(raw) => raw,
        }
    }

    pub fn valid(&self) -> Option<OrderStatus> {
        match self {
            StoredStatus::Valid(status) => Some(*status),
            StoredStatus::Invalid(_) => None,
        }
    }

    /// The closed-vocabulary status this value should be read as.
    pub fn normalized(&self) -> OrderStatus {
        match self {
            StoredStatus::Valid(status) => *status,
            StoredStatus::Invalid(raw) => normalize_legacy_status(raw),
        }
    }
}

impl From<OrderStatus> for StoredStatus {
    fn from(status: OrderStatus) -> Self {
        StoredStatus::Valid(status)
    }
}

impl PartialEq<OrderStatus> for StoredStatus {
    fn eq(&self, other: &OrderStatus) -> bool {
        matches!(self, StoredStatus::Valid(s) if s == other)
    }
}

impl fmt::Display for StoredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
