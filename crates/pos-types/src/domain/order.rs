use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::delivery::DeliveryDraft;
use crate::domain::status::{LifecycleField, OrderStatus, StoredStatus};

pub type OrderId = i64;
pub type UserId = i64;

pub const DEFAULT_COOKING_ETA_MINUTES: u32 = 20;
pub const DEFAULT_DELIVERY_ETA_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Cash,
    Card,
    Online,
}

macro_rules! snake_case_str {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn parse(raw: &str) -> Option<Self> {
                match raw {
                    $($s => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

snake_case_str!(OrderType {
    DineIn => "dine_in",
    Takeaway => "takeaway",
    Delivery => "delivery",
});

snake_case_str!(PaymentStatus {
    Unpaid => "unpaid",
    Paid => "paid",
    Refunded => "refunded",
});

snake_case_str!(PaymentType {
    Cash => "cash",
    Card => "card",
    Online => "online",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// Back-office only; never shown to customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDraft {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
}

/// Caller input for a new order, before pricing and numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub items: Vec<ItemDraft>,
    #[serde(default)]
    pub delivery_charge: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub cashier_id: Option<UserId>,
    #[serde(default)]
    pub cooking_eta_minutes: Option<u32>,
    #[serde(default)]
    pub delivery_eta_minutes: Option<u32>,
    #[serde(default)]
    pub delivery: Option<DeliveryDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub tracking_token: Option<String>,
    pub order_type: OrderType,
    pub subtotal: Decimal,
    pub delivery_charge: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_type: PaymentType,
    pub status: StoredStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cooking_started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub cooking_eta_minutes: u32,
    pub delivery_eta_minutes: u32,
    pub cashier_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A priced, numbered order ready to be persisted; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub order_type: OrderType,
    pub subtotal: Decimal,
    pub delivery_charge: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_type: PaymentType,
    pub status: StoredStatus,
    pub cooking_eta_minutes: u32,
    pub delivery_eta_minutes: u32,
    pub cashier_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

fn non_negative(value: Decimal, field: &str) -> anyhow::Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        anyhow::bail!("{field} must be non-negative");
    }
    Ok(())
}

impl NewOrder {
    pub fn from_draft(
        draft: &OrderDraft,
        order_number: String,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        if draft.items.is_empty() {
            anyhow::bail!("items empty");
        }
        let mut items = Vec::with_capacity(draft.items.len());
        for it in &draft.items {
            if it.product_name.trim().is_empty() {
                anyhow::bail!("product_name empty");
            }
            if it.quantity == 0 {
                anyhow::bail!("item quantity must be > 0");
            }
            non_negative(it.unit_price, "unit_price")?;
            if let Some(cost) = it.cost_price {
                non_negative(cost, "cost_price")?;
            }
            items.push(OrderItem {
                product_name: it.product_name.clone(),
                quantity: it.quantity,
                unit_price: it.unit_price,
                line_total: it.unit_price * Decimal::from(it.quantity),
                cost_price: it.cost_price,
            });
        }
        non_negative(draft.delivery_charge, "delivery_charge")?;
        non_negative(draft.discount, "discount")?;
        non_negative(draft.tax, "tax")?;

        match (draft.order_type, &draft.delivery) {
            (OrderType::Delivery, None) => anyhow::bail!("delivery details required"),
            (OrderType::Delivery, Some(d)) => d.validate()?,
            (_, Some(_)) => anyhow::bail!("delivery details only apply to delivery orders"),
            (_, None) => {}
        }
        let delivery_charge = match &draft.delivery {
            Some(d) if d.is_free_delivery => Decimal::ZERO,
            _ => draft.delivery_charge,
        };

        let subtotal: Decimal = items.iter().map(|it| it.line_total).sum();
        let grand_total = subtotal + delivery_charge + draft.tax - draft.discount;
        if grand_total.is_sign_negative() && !grand_total.is_zero() {
            anyhow::bail!("discount exceeds order total");
        }

        Ok(Self {
            order_number,
            order_type: draft.order_type,
            subtotal,
            delivery_charge,
            discount: draft.discount,
            tax: draft.tax,
            grand_total,
            payment_status: draft.payment_status,
            payment_type: draft.payment_type,
            status: OrderStatus::Pending.into(),
            cooking_eta_minutes: draft
                .cooking_eta_minutes
                .unwrap_or(DEFAULT_COOKING_ETA_MINUTES),
            delivery_eta_minutes: draft
                .delivery_eta_minutes
                .unwrap_or(DEFAULT_DELIVERY_ETA_MINUTES),
            cashier_id: draft.cashier_id,
            items,
            created_at: now,
        })
    }

    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            order_number: self.order_number,
            tracking_token: None,
            order_type: self.order_type,
            subtotal: self.subtotal,
            delivery_charge: self.delivery_charge,
            discount: self.discount,
            tax: self.tax,
            grand_total: self.grand_total,
            payment_status: self.payment_status,
            payment_type: self.payment_type,
            status: self.status,
            confirmed_at: None,
            cooking_started_at: None,
            ready_at: None,
            dispatched_at: None,
            cooking_eta_minutes: self.cooking_eta_minutes,
            delivery_eta_minutes: self.delivery_eta_minutes,
            cashier_id: self.cashier_id,
            items: self.items,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Status column values written by one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusFields {
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
    pub stamp: Option<(LifecycleField, DateTime<Utc>)>,
}

impl Order {
    pub fn lifecycle_timestamp(&self, field: LifecycleField) -> Option<DateTime<Utc>> {
        match field {
            LifecycleField::ConfirmedAt => self.confirmed_at,
            LifecycleField::CookingStartedAt => self.cooking_started_at,
            LifecycleField::ReadyAt => self.ready_at,
            LifecycleField::DispatchedAt => self.dispatched_at,
        }
    }

    /// Applies a status write in place. Lifecycle stamps are only ever
    /// set or refreshed, never cleared.
    pub fn apply_status_fields(&mut self, fields: &StatusFields) {
        self.status = fields.status.into();
        self.updated_at = fields.updated_at;
        if let Some((field, at)) = fields.stamp {
            let slot = match field {
                LifecycleField::ConfirmedAt => &mut self.confirmed_at,
                LifecycleField::CookingStartedAt => &mut self.cooking_started_at,
                LifecycleField::ReadyAt => &mut self.ready_at,
                LifecycleField::DispatchedAt => &mut self.dispatched_at,
            };
            *slot = Some(at);
        }
    }
}
