use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pos_types::domain::audit::{NewAuditRecord, StatusAuditRecord};
use pos_types::domain::delivery::{
    Delivery, DeliveryChange, DeliveryId, DeliveryStatus, NewDelivery,
};
use pos_types::domain::order::{NewOrder, Order, OrderId, StatusFields};
use pos_types::domain::rider::{Rider, RiderId, RiderPayout};
use pos_types::ports::audit_log::AuditLog;
use pos_types::ports::delivery_store::DeliveryStore;
use pos_types::ports::order_store::{OrderStore, RepoError};
use pos_types::ports::rider_directory::RiderDirectory;
use pos_types::ports::transition::{OrderIntake, TransitionCommit, TransitionWriter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

// Lock order when more than one map is touched: orders, tokens,
// deliveries, audit.
#[derive(Default)]
struct MemoryState {
    orders: DashMap<OrderId, Order>,
    tokens: DashMap<String, OrderId>,
    deliveries: DashMap<DeliveryId, Delivery>,
    delivery_by_order: DashMap<OrderId, DeliveryId>,
    audit: DashMap<OrderId, Vec<StatusAuditRecord>>,
    riders: DashMap<RiderId, Rider>,
    order_seq: AtomicI64,
    delivery_seq: AtomicI64,
    audit_seq: AtomicI64,
}

#[derive(Clone, Default)]
pub struct InMemoryRepo {
    state: Arc<MemoryState>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(seq: &AtomicI64) -> i64 {
        seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn push_audit(&self, record: NewAuditRecord) -> StatusAuditRecord {
        let record = record.into_record(Self::next(&self.state.audit_seq));
        self.state
            .audit
            .entry(record.order_id)
            .or_default()
            .push(record.clone());
        record
    }

    /// Number of audit rows across all orders.
    pub fn audit_len(&self) -> usize {
        self.state.audit.iter().map(|kv| kv.value().len()).sum()
    }
}

#[async_trait]
impl OrderStore for InMemoryRepo {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError> {
        let order = order.into_order(Self::next(&self.state.order_seq));
        self.state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        Ok(self.state.orders.get(&id).map(|r| r.clone()))
    }

    async fn get_by_tracking_token(&self, token: &str) -> Result<Option<Order>, RepoError> {
        let id = self.state.tokens.get(token).map(|r| *r);
        match id {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .state
            .orders
            .iter()
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn update_status_fields(
        &self,
        id: OrderId,
        fields: &StatusFields,
    ) -> Result<Option<Order>, RepoError> {
        if let Some(mut v) = self.state.orders.get_mut(&id) {
            v.apply_status_fields(fields);
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }

    async fn set_tracking_token(&self, id: OrderId, token: &str) -> Result<bool, RepoError> {
        let Some(mut order) = self.state.orders.get_mut(&id) else {
            return Ok(false);
        };
        match self.state.tokens.entry(token.to_string()) {
            Entry::Occupied(e) if *e.get() != id => {
                return Err(RepoError::Conflict(format!(
                    "tracking token already assigned to order {}",
                    e.get()
                )));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(e) => {
                e.insert(id);
            }
        }
        if let Some(previous) = order.tracking_token.replace(token.to_string()) {
            if previous != token {
                self.state.tokens.remove(&previous);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl DeliveryStore for InMemoryRepo {
    async fn create_delivery(&self, delivery: NewDelivery) -> Result<Delivery, RepoError> {
        match self.state.delivery_by_order.entry(delivery.order_id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "order {} already has a delivery",
                delivery.order_id
            ))),
            Entry::Vacant(e) => {
                let delivery = delivery.into_delivery(Self::next(&self.state.delivery_seq));
                self.state.deliveries.insert(delivery.id, delivery.clone());
                e.insert(delivery.id);
                Ok(delivery)
            }
        }
    }

    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Option<Delivery>, RepoError> {
        let id = self.state.delivery_by_order.get(&order_id).map(|r| *r);
        Ok(id.and_then(|id| self.state.deliveries.get(&id).map(|r| r.clone())))
    }

    async fn update_rider_assignment(
        &self,
        delivery_id: DeliveryId,
        rider_id: RiderId,
        payout: &RiderPayout,
    ) -> Result<bool, RepoError> {
        match self.state.deliveries.get_mut(&delivery_id) {
            Some(mut d) => {
                d.apply(&DeliveryChange::AssignRider {
                    delivery_id,
                    rider_id,
                    payout: *payout,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_delivery_status(
        &self,
        delivery_id: DeliveryId,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        match self.state.deliveries.get_mut(&delivery_id) {
            Some(mut d) => {
                d.status = status;
                if delivered_at.is_some() {
                    d.delivered_at = delivered_at;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AuditLog for InMemoryRepo {
    async fn append(&self, record: NewAuditRecord) -> Result<StatusAuditRecord, RepoError> {
        Ok(self.push_audit(record))
    }

    async fn query_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusAuditRecord>, RepoError> {
        Ok(self
            .state
            .audit
            .get(&order_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RiderDirectory for InMemoryRepo {
    async fn get_rider(&self, id: RiderId) -> Result<Option<Rider>, RepoError> {
        Ok(self.state.riders.get(&id).map(|r| r.clone()))
    }

    async fn save_rider(&self, rider: Rider) -> Result<Rider, RepoError> {
        self.state.riders.insert(rider.id, rider.clone());
        Ok(rider)
    }
}

#[async_trait]
impl TransitionWriter for InMemoryRepo {
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<Option<Order>, RepoError> {
        // The order row guard is held for the whole commit, so concurrent
        // transitions on one order serialize here.
        let Some(mut order) = self.state.orders.get_mut(&commit.order_id) else {
            return Ok(None);
        };
        if let Some(change) = &commit.delivery {
            let Some(mut delivery) = self.state.deliveries.get_mut(&change.delivery_id()) else {
                return Err(RepoError::DbError(format!(
                    "delivery {} not found",
                    change.delivery_id()
                )));
            };
            delivery.apply(change);
        }
        order.apply_status_fields(&commit.fields);
        self.push_audit(commit.audit);
        Ok(Some(order.clone()))
    }

    async fn create_order_bundle(
        &self,
        intake: OrderIntake,
    ) -> Result<(Order, Option<Delivery>), RepoError> {
        let id = Self::next(&self.state.order_seq);
        // The vacant slot keeps the order hidden until every row is in place.
        let Entry::Vacant(slot) = self.state.orders.entry(id) else {
            return Err(RepoError::Conflict(format!("order {} already exists", id)));
        };
        let delivery = match intake.delivery {
            Some(mut new) => {
                new.order_id = id;
                let Entry::Vacant(e) = self.state.delivery_by_order.entry(id) else {
                    return Err(RepoError::Conflict(format!(
                        "order {} already has a delivery",
                        id
                    )));
                };
                let delivery = new.into_delivery(Self::next(&self.state.delivery_seq));
                self.state.deliveries.insert(delivery.id, delivery.clone());
                e.insert(delivery.id);
                Some(delivery)
            }
            None => None,
        };
        let mut audit = intake.audit;
        audit.order_id = id;
        self.push_audit(audit);

        let order = intake.order.into_order(id);
        slot.insert(order.clone());
        Ok((order, delivery))
    }
}
