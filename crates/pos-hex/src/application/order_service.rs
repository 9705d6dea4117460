use crate::errors::AppError;
use pos_types::domain::audit::{NewAuditRecord, Source, StatusAuditRecord};
use pos_types::domain::delivery::{Delivery, NewDelivery};
use pos_types::domain::order::{NewOrder, Order, OrderDraft, OrderId, UserId};
use pos_types::domain::status::OrderStatus;
use pos_types::ports::clock::Clock;
use pos_types::ports::random::RandomSource;
use pos_types::ports::transition::{OrderIntake, PosStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedOrder {
    pub order: Order,
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Clone, Copy)]
pub struct EtaDefaults {
    pub cooking_minutes: u32,
    pub delivery_minutes: u32,
}

pub struct OrderService<S: PosStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    eta: EtaDefaults,
}

impl<S: PosStore> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            random: self.random.clone(),
            eta: self.eta,
        }
    }
}

impl<S: PosStore> OrderService<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        eta: EtaDefaults,
    ) -> Self {
        Self {
            store,
            clock,
            random,
            eta,
        }
    }

    fn order_number(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        let mut suffix = [0u8; 3];
        self.random.fill_bytes(&mut suffix);
        format!(
            "ORD-{}-{}",
            now.format("%Y%m%d"),
            hex::encode_upper(suffix)
        )
    }

    /// Persists the order, its delivery row for delivery orders, and the
    /// opening `pending` audit entry in one store write.
    pub async fn create_order(
        &self,
        mut draft: OrderDraft,
        source: Source,
        actor_user_id: UserId,
    ) -> Result<CreatedOrder, AppError> {
        draft
            .cooking_eta_minutes
            .get_or_insert(self.eta.cooking_minutes);
        draft
            .delivery_eta_minutes
            .get_or_insert(self.eta.delivery_minutes);

        let now = self.clock.now();
        let new_order = NewOrder::from_draft(&draft, self.order_number(now), now)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let delivery = draft.delivery.as_ref().map(|details| {
            NewDelivery::from_draft(0, details, new_order.delivery_charge, now)
        });
        let (order, delivery) = self
            .store
            .create_order_bundle(OrderIntake {
                order: new_order,
                delivery,
                audit: NewAuditRecord {
                    order_id: 0,
                    status_from: OrderStatus::Pending.into(),
                    status_to: OrderStatus::Pending,
                    source,
                    actor_user_id,
                    notes: Some("order_created".into()),
                    created_at: now,
                },
            })
            .await?;

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            order_type = order.order_type.as_str(),
            grand_total = %order.grand_total,
            "order created"
        );
        Ok(CreatedOrder { order, delivery })
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        match self.store.get(id).await? {
            Some(o) => Ok(o),
            None => Err(AppError::NotFound(format!("order {}", id))),
        }
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list().await?)
    }

    pub async fn get_delivery(&self, order_id: OrderId) -> Result<Delivery, AppError> {
        self.store
            .get_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("delivery for order {}", order_id)))
    }

    /// Status audit trail for one order, oldest first.
    pub async fn order_history(&self, id: OrderId) -> Result<Vec<StatusAuditRecord>, AppError> {
        self.get_order(id).await?;
        Ok(self.store.query_by_order(id).await?)
    }
}
