use crate::errors::AppError;
use pos_types::domain::audit::{NewAuditRecord, Source};
use pos_types::domain::delivery::DeliveryChange;
use pos_types::domain::order::{Order, OrderId, StatusFields, UserId};
use pos_types::domain::status::{OrderStatus, StoredStatus};
use pos_types::ports::clock::Clock;
use pos_types::ports::transition::{PosStore, TransitionCommit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionOptions {
    /// Write and audit even when the order is already in the target status.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionOutcome {
    pub success: bool,
    pub message: String,
    pub order_id: OrderId,
    pub old_status: StoredStatus,
    pub new_status: OrderStatus,
    /// `false` for an idempotent no-op.
    pub changed: bool,
}

/// Fully resolved transition, ready to be committed.
#[derive(Debug, Clone)]
pub(crate) struct TransitionRequest {
    pub target: OrderStatus,
    pub source: Source,
    pub actor_user_id: UserId,
    pub notes: Option<String>,
    pub force: bool,
    pub delivery: Option<DeliveryChange>,
}

pub struct OrderStatusService<S: PosStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: PosStore> Clone for OrderStatusService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: PosStore> OrderStatusService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Same as [`Self::transition_status`] for a status arriving as text.
    /// Unknown strings are rejected before storage is consulted.
    pub async fn transition_status_raw(
        &self,
        order_id: OrderId,
        new_status: &str,
        source: Source,
        actor_user_id: UserId,
        options: TransitionOptions,
    ) -> Result<TransitionOutcome, AppError> {
        let status = new_status
            .parse::<OrderStatus>()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        self.transition_status(order_id, status, source, actor_user_id, options)
            .await
    }

    pub async fn transition_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        source: Source,
        actor_user_id: UserId,
        options: TransitionOptions,
    ) -> Result<TransitionOutcome, AppError> {
        let order = self.load(order_id).await?;
        self.execute(
            order,
            TransitionRequest {
                target: new_status,
                source,
                actor_user_id,
                notes: options.notes,
                force: options.force,
                delivery: None,
            },
        )
        .await
    }

    pub(crate) async fn load(&self, order_id: OrderId) -> Result<Order, AppError> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))
    }

    /// Commits `req` against the already loaded `order`.
    ///
    /// Entering a status that has a lifecycle field stamps it with the
    /// current time, refreshing any earlier value. A delivery-only commit
    /// that keeps the status leaves the stamps alone.
    pub(crate) async fn execute(
        &self,
        order: Order,
        req: TransitionRequest,
    ) -> Result<TransitionOutcome, AppError> {
        let old_status = order.status.clone();
        if old_status == req.target && !req.force && req.delivery.is_none() {
            debug!(order_id = order.id, status = %req.target, "status unchanged");
            return Ok(TransitionOutcome {
                success: true,
                message: format!("order already {}", req.target),
                order_id: order.id,
                old_status,
                new_status: req.target,
                changed: false,
            });
        }

        let now = self.clock.now();
        let entering = old_status != req.target || req.force;
        let commit = TransitionCommit {
            order_id: order.id,
            fields: StatusFields {
                status: req.target,
                updated_at: now,
                stamp: req
                    .target
                    .timestamp_field()
                    .filter(|_| entering)
                    .map(|field| (field, now)),
            },
            delivery: req.delivery,
            audit: NewAuditRecord {
                order_id: order.id,
                status_from: old_status.clone(),
                status_to: req.target,
                source: req.source,
                actor_user_id: req.actor_user_id,
                notes: req.notes,
                created_at: now,
            },
        };

        if self.store.commit_transition(commit).await?.is_none() {
            return Err(AppError::NotFound(format!("order {}", order.id)));
        }

        info!(
            order_id = order.id,
            from = %old_status,
            to = %req.target,
            source = %req.source,
            actor = req.actor_user_id,
            "order status changed"
        );
        Ok(TransitionOutcome {
            success: true,
            message: format!("order moved from {} to {}", old_status, req.target),
            order_id: order.id,
            old_status,
            new_status: req.target,
            changed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pos_repo::memory::InMemoryRepo;
    use pos_types::domain::order::{ItemDraft, NewOrder, OrderDraft, OrderType};
    use pos_types::ports::audit_log::AuditLog;
    use pos_types::ports::clock::ManualClock;
    use pos_types::ports::order_store::OrderStore;
    use rust_decimal::Decimal;

    type Setup = (
        Arc<InMemoryRepo>,
        Arc<ManualClock>,
        OrderStatusService<InMemoryRepo>,
        OrderId,
    );

    async fn setup() -> Setup {
        let repo = Arc::new(InMemoryRepo::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let draft = OrderDraft {
            order_type: OrderType::DineIn,
            items: vec![ItemDraft {
                product_name: "Chicken Tikka".into(),
                quantity: 2,
                unit_price: Decimal::from(450),
                cost_price: Some(Decimal::from(200)),
            }],
            delivery_charge: Decimal::ZERO,
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            payment_status: Default::default(),
            payment_type: Default::default(),
            cashier_id: Some(3),
            cooking_eta_minutes: None,
            delivery_eta_minutes: None,
            delivery: None,
        };
        let order = repo
            .create(NewOrder::from_draft(&draft, "ORD-T".into(), clock.now()).unwrap())
            .await
            .unwrap();
        let svc = OrderStatusService::new(repo.clone(), clock.clone());
        (repo, clock, svc, order.id)
    }

    #[tokio::test]
    async fn transition_stamps_lifecycle_field_and_audits() {
        let (repo, clock, svc, id) = setup().await;
        clock.advance(Duration::minutes(2));
        let out = svc
            .transition_status(
                id,
                OrderStatus::Cooking,
                Source::Kds,
                9,
                TransitionOptions::default(),
            )
            .await
            .unwrap();
        assert!(out.success && out.changed);
        assert_eq!(out.old_status, OrderStatus::Pending);

        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cooking);
        assert_eq!(order.cooking_started_at, Some(clock.now()));
        assert_eq!(order.updated_at, clock.now());

        let trail = repo.query_by_order(id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].source, Source::Kds);
        assert_eq!(trail[0].actor_user_id, 9);
        assert_eq!(trail[0].status_to, OrderStatus::Cooking);
    }

    #[tokio::test]
    async fn repeated_transition_is_idempotent() {
        let (repo, clock, svc, id) = setup().await;
        svc.transition_status(id, OrderStatus::Ready, Source::Kds, 1, Default::default())
            .await
            .unwrap();
        let first = repo.get(id).await.unwrap().unwrap();

        clock.advance(Duration::minutes(5));
        let again = svc
            .transition_status(id, OrderStatus::Ready, Source::Kds, 1, Default::default())
            .await
            .unwrap();
        assert!(again.success);
        assert!(!again.changed);

        let second = repo.get(id).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.query_by_order(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn forced_reentry_refreshes_timestamp() {
        let (repo, clock, svc, id) = setup().await;
        svc.transition_status(
            id,
            OrderStatus::Cooking,
            Source::Kds,
            1,
            Default::default(),
        )
        .await
        .unwrap();
        let started = clock.now();
        clock.advance(Duration::minutes(7));
        let out = svc
            .transition_status(
                id,
                OrderStatus::Cooking,
                Source::Pos,
                2,
                TransitionOptions {
                    force: true,
                    notes: Some("reopened".into()),
                },
            )
            .await
            .unwrap();
        assert!(out.changed);
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.cooking_started_at, Some(started + Duration::minutes(7)));
        let trail = repo.query_by_order(id).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].notes.as_deref(), Some("reopened"));
    }

    #[tokio::test]
    async fn bogus_status_is_rejected_without_side_effects() {
        let (repo, _clock, svc, id) = setup().await;
        let res = svc
            .transition_status_raw(id, "bogus_status", Source::Api, 1, Default::default())
            .await;
        assert!(matches!(res, Err(AppError::InvalidInput(_))));
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(repo.query_by_order(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let (repo, _clock, svc, _id) = setup().await;
        let res = svc
            .transition_status(
                404,
                OrderStatus::Confirmed,
                Source::Pos,
                1,
                Default::default(),
            )
            .await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
        assert_eq!(repo.audit_len(), 0);
    }

    #[tokio::test]
    async fn terminal_statuses_do_not_clear_stamps() {
        let (repo, _clock, svc, id) = setup().await;
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Cooking,
            OrderStatus::Cancelled,
        ] {
            svc.transition_status(id, status, Source::Pos, 1, Default::default())
                .await
                .unwrap();
        }
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.confirmed_at.is_some());
        assert!(order.cooking_started_at.is_some());
    }
}
