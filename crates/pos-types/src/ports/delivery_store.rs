use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::delivery::{Delivery, DeliveryId, DeliveryStatus, NewDelivery};
use crate::domain::order::OrderId;
use crate::domain::rider::{RiderId, RiderPayout};
use crate::ports::order_store::RepoError;

#[async_trait]
pub trait DeliveryStore: Send + Sync + 'static {
    async fn create_delivery(&self, delivery: NewDelivery) -> Result<Delivery, RepoError>;
    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Option<Delivery>, RepoError>;
    async fn update_rider_assignment(
        &self,
        delivery_id: DeliveryId,
        rider_id: RiderId,
        payout: &RiderPayout,
    ) -> Result<bool, RepoError>;
    async fn update_delivery_status(
        &self,
        delivery_id: DeliveryId,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError>;
}
