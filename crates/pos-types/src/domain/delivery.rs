use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderId;
use crate::domain::rider::{PayoutSlab, PayoutType, RiderId, RiderPayout};

pub type DeliveryId = i64;

/// Delivery-side progress; deliberately separate from the order status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Assigned,
    Picked,
    OnRoute,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::Picked => "picked",
            DeliveryStatus::OnRoute => "on_route",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(DeliveryStatus::Pending),
            "assigned" => Some(DeliveryStatus::Assigned),
            "picked" => Some(DeliveryStatus::Picked),
            "on_route" => Some(DeliveryStatus::OnRoute),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDraft {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub address: String,
    pub location_name: String,
    pub distance_km: Decimal,
    #[serde(default)]
    pub is_free_delivery: bool,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl DeliveryDraft {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.customer_name.trim().is_empty() {
            anyhow::bail!("customer_name empty");
        }
        if self.customer_phone.trim().is_empty() {
            anyhow::bail!("customer_phone empty");
        }
        if self.distance_km.is_sign_negative() && !self.distance_km.is_zero() {
            anyhow::bail!("distance_km must be non-negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: DeliveryId,
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub location_name: String,
    pub distance_km: Decimal,
    pub delivery_charge: Decimal,
    pub is_free_delivery: bool,
    pub special_instructions: Option<String>,
    pub assigned_rider_id: Option<RiderId>,
    pub status: DeliveryStatus,
    pub rider_pay_amount: Option<Decimal>,
    pub rider_pay_slab: Option<PayoutSlab>,
    pub rider_pay_type: Option<PayoutType>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDelivery {
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub location_name: String,
    pub distance_km: Decimal,
    pub delivery_charge: Decimal,
    pub is_free_delivery: bool,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewDelivery {
    pub fn from_draft(
        order_id: OrderId,
        draft: &DeliveryDraft,
        delivery_charge: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            customer_name: draft.customer_name.clone(),
            customer_phone: draft.customer_phone.clone(),
            address: draft.address.clone(),
            location_name: draft.location_name.clone(),
            distance_km: draft.distance_km,
            delivery_charge,
            is_free_delivery: draft.is_free_delivery,
            special_instructions: draft.special_instructions.clone(),
            created_at: now,
        }
    }

    pub fn into_delivery(self, id: DeliveryId) -> Delivery {
        Delivery {
            id,
            order_id: self.order_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            address: self.address,
            location_name: self.location_name,
            distance_km: self.distance_km,
            delivery_charge: self.delivery_charge,
            is_free_delivery: self.is_free_delivery,
            special_instructions: self.special_instructions,
            assigned_rider_id: None,
            status: DeliveryStatus::Pending,
            rider_pay_amount: None,
            rider_pay_slab: None,
            rider_pay_type: None,
            delivered_at: None,
            created_at: self.created_at,
        }
    }
}

/// Delivery row write that rides along with an order status commit.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryChange {
    AssignRider {
        delivery_id: DeliveryId,
        rider_id: RiderId,
        payout: RiderPayout,
    },
    Complete {
        delivery_id: DeliveryId,
        delivered_at: DateTime<Utc>,
    },
}

impl Delivery {
    pub fn apply(&mut self, change: &DeliveryChange) {
        match change {
            DeliveryChange::AssignRider {
                rider_id, payout, ..
            } => {
                self.assigned_rider_id = Some(*rider_id);
                self.status = DeliveryStatus::Assigned;
                self.rider_pay_amount = Some(payout.amount);
                self.rider_pay_slab = Some(payout.slab);
                self.rider_pay_type = Some(payout.payout_type);
            }
            DeliveryChange::Complete { delivered_at, .. } => {
                self.status = DeliveryStatus::Delivered;
                self.delivered_at = Some(*delivered_at);
            }
        }
    }
}

impl DeliveryChange {
    pub fn delivery_id(&self) -> DeliveryId {
        match self {
            DeliveryChange::AssignRider { delivery_id, .. }
            | DeliveryChange::Complete { delivery_id, .. } => *delivery_id,
        }
    }
}
