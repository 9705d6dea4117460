//! Customer-facing projection of an order, served to anyone holding the
//! tracking token. Only fields listed here ever leave the back office.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::delivery::{Delivery, DeliveryStatus};
use crate::domain::order::{Order, OrderId, OrderItem, OrderType};
use crate::domain::rider::Rider;
use crate::domain::status::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderView {
    pub order_id: OrderId,
    pub order_number: String,
    pub order_type: OrderType,
    pub subtotal: Decimal,
    pub delivery_charge: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub status: OrderStatus,
    pub cooking_eta_minutes: u32,
    pub delivery_eta_minutes: u32,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cooking_started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub delivery: Option<DeliveryView>,
    pub rider: Option<RiderView>,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryView {
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub location_name: String,
    pub special_instructions: Option<String>,
    pub status: DeliveryStatus,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiderView {
    pub name: String,
    pub phone: String,
    pub vehicle_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemView {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<&Delivery> for DeliveryView {
    fn from(d: &Delivery) -> Self {
        Self {
            customer_name: d.customer_name.clone(),
            customer_phone: d.customer_phone.clone(),
            address: d.address.clone(),
            location_name: d.location_name.clone(),
            special_instructions: d.special_instructions.clone(),
            status: d.status,
            delivered_at: d.delivered_at,
        }
    }
}

impl From<&Rider> for RiderView {
    fn from(r: &Rider) -> Self {
        Self {
            name: r.name.clone(),
            phone: r.phone.clone(),
            vehicle_number: r.vehicle_number.clone(),
        }
    }
}

impl From<&OrderItem> for ItemView {
    fn from(it: &OrderItem) -> Self {
        Self {
            product_name: it.product_name.clone(),
            quantity: it.quantity,
            unit_price: it.unit_price,
            line_total: it.line_total,
        }
    }
}

impl OrderView {
    pub fn project(order: &Order, delivery: Option<&Delivery>, rider: Option<&Rider>) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            order_type: order.order_type,
            subtotal: order.subtotal,
            delivery_charge: order.delivery_charge,
            discount: order.discount,
            tax: order.tax,
            grand_total: order.grand_total,
            status: order.status.normalized(),
            cooking_eta_minutes: order.cooking_eta_minutes,
            delivery_eta_minutes: order.delivery_eta_minutes,
            confirmed_at: order.confirmed_at,
            cooking_started_at: order.cooking_started_at,
            ready_at: order.ready_at,
            dispatched_at: order.dispatched_at,
            created_at: order.created_at,
            delivery: delivery.map(DeliveryView::from),
            rider: rider.map(RiderView::from),
            items: order.items.iter().map(ItemView::from).collect(),
        }
    }
}
