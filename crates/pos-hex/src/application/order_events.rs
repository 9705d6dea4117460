//! Named lifecycle events layered on the status service. Each event lands
//! the order in one fixed status; rider assignment and delivery
//! completion also write the delivery row inside the same commit.

use crate::application::status_service::{
    OrderStatusService, TransitionOutcome, TransitionRequest,
};
use crate::errors::AppError;
use pos_types::domain::audit::Source;
use pos_types::domain::delivery::{DeliveryChange, DeliveryStatus};
use pos_types::domain::event::OrderEvent;
use pos_types::domain::order::{OrderId, UserId};
use pos_types::domain::payout::compute_payout;
use pos_types::domain::rider::{RiderId, RiderPayout, RiderStatus};
use pos_types::ports::clock::Clock;
use pos_types::ports::transition::PosStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOptions {
    pub source: Source,
    pub actor_user_id: UserId,
    #[serde(default)]
    pub rider_id: Option<RiderId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub force: bool,
}

impl DispatchOptions {
    pub fn new(source: Source, actor_user_id: UserId) -> Self {
        Self {
            source,
            actor_user_id,
            rider_id: None,
            notes: None,
            force: false,
        }
    }

    pub fn rider(mut self, rider_id: RiderId) -> Self {
        self.rider_id = Some(rider_id);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventOutcome {
    pub event: OrderEvent,
    #[serde(flatten)]
    pub transition: TransitionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_id: Option<RiderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<RiderPayout>,
}

pub struct OrderEventsDispatcher<S: PosStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    status: OrderStatusService<S>,
}

impl<S: PosStore> Clone for OrderEventsDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            status: self.status.clone(),
        }
    }
}

impl<S: PosStore> OrderEventsDispatcher<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let status = OrderStatusService::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            status,
        }
    }

    pub async fn dispatch_raw(
        &self,
        order_id: OrderId,
        event: &str,
        options: DispatchOptions,
    ) -> Result<EventOutcome, AppError> {
        let event = event
            .parse::<OrderEvent>()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        self.dispatch(order_id, event, options).await
    }

    pub async fn dispatch(
        &self,
        order_id: OrderId,
        event: OrderEvent,
        options: DispatchOptions,
    ) -> Result<EventOutcome, AppError> {
        let order = self.status.load(order_id).await?;

        let mut notes = options.notes;
        let mut payout = None;
        let delivery = match event {
            OrderEvent::RiderAssigned => {
                let rider_id = options.rider_id.ok_or_else(|| {
                    AppError::InvalidInput("rider_assigned requires a rider_id".into())
                })?;
                let delivery = self
                    .store
                    .get_by_order_id(order_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("delivery for order {}", order_id)))?;
                let rider = self
                    .store
                    .get_rider(rider_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("rider {}", rider_id)))?;
                if rider.status == RiderStatus::Inactive {
                    return Err(AppError::InvalidInput(format!("rider {} is inactive", rider_id)));
                }
                let computed = compute_payout(&rider, delivery.distance_km)
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                payout = Some(computed);
                notes.get_or_insert_with(|| format!("rider {} assigned", rider_id));
                Some(DeliveryChange::AssignRider {
                    delivery_id: delivery.id,
                    rider_id,
                    payout: computed,
                })
            }
            OrderEvent::OrderDelivered => self
                .store
                .get_by_order_id(order_id)
                .await?
                .filter(|d| d.status != DeliveryStatus::Delivered)
                .map(|d| DeliveryChange::Complete {
                    delivery_id: d.id,
                    delivered_at: self.clock.now(),
                }),
            _ => None,
        };

        let transition = self
            .status
            .execute(
                order,
                TransitionRequest {
                    target: event.target_status(),
                    source: options.source,
                    actor_user_id: options.actor_user_id,
                    notes,
                    force: options.force,
                    delivery,
                },
            )
            .await?;

        if let Some(p) = &payout {
            info!(
                order_id,
                rider_id = ?options.rider_id,
                amount = %p.amount,
                slab = %p.slab,
                "rider assigned"
            );
        }
        Ok(EventOutcome {
            event,
            transition,
            rider_id: options.rider_id.filter(|_| event == OrderEvent::RiderAssigned),
            payout,
        })
    }
}
