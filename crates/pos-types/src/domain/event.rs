//! Named lifecycle events and the status each one lands the order in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::status::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    OrderCreated,
    OrderConfirmed,
    CookingStarted,
    KitchenCompleted,
    RiderAssigned,
    OrderDispatched,
    OrderDelivered,
    OrderCancelled,
    OrderCompleted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown order event: {0:?}")]
pub struct UnknownEvent(pub String);

impl OrderEvent {
    pub const ALL: [OrderEvent; 9] = [
        OrderEvent::OrderCreated,
        OrderEvent::OrderConfirmed,
        OrderEvent::CookingStarted,
        OrderEvent::KitchenCompleted,
        OrderEvent::RiderAssigned,
        OrderEvent::OrderDispatched,
        OrderEvent::OrderDelivered,
        OrderEvent::OrderCancelled,
        OrderEvent::OrderCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated => "order_created",
            OrderEvent::OrderConfirmed => "order_confirmed",
            OrderEvent::CookingStarted => "cooking_started",
            OrderEvent::KitchenCompleted => "kitchen_completed",
            OrderEvent::RiderAssigned => "rider_assigned",
            OrderEvent::OrderDispatched => "order_dispatched",
            OrderEvent::OrderDelivered => "order_delivered",
            OrderEvent::OrderCancelled => "order_cancelled",
            OrderEvent::OrderCompleted => "order_completed",
        }
    }

    pub fn target_status(&self) -> OrderStatus {
        match self {
            OrderEvent::OrderCreated => OrderStatus::Pending,
            OrderEvent::OrderConfirmed => OrderStatus::Confirmed,
            OrderEvent::CookingStarted => OrderStatus::Cooking,
            OrderEvent::KitchenCompleted => OrderStatus::Ready,
            OrderEvent::RiderAssigned => OrderStatus::Ready,
            OrderEvent::OrderDispatched => OrderStatus::Dispatched,
            OrderEvent::OrderDelivered => OrderStatus::Delivered,
            OrderEvent::OrderCancelled => OrderStatus::Cancelled,
            OrderEvent::OrderCompleted => OrderStatus::Completed,
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderEvent::ALL
            .into_iter()
            .find(|ev| ev.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

pub fn status_for_event(event: &str) -> Option<OrderStatus> {
    event.parse::<OrderEvent>().ok().map(|ev| ev.target_status())
}
