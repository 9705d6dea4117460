use async_trait::async_trait;

use crate::domain::audit::NewAuditRecord;
use crate::domain::delivery::{Delivery, DeliveryChange, NewDelivery};
use crate::domain::order::{NewOrder, Order, OrderId, StatusFields};
use crate::ports::audit_log::AuditLog;
use crate::ports::delivery_store::DeliveryStore;
use crate::ports::order_store::{OrderStore, RepoError};
use crate::ports::rider_directory::RiderDirectory;

/// Everything one lifecycle change writes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCommit {
    pub order_id: OrderId,
    pub fields: StatusFields,
    pub delivery: Option<DeliveryChange>,
    pub audit: NewAuditRecord,
}

/// A new order with its delivery row and opening audit entry. The store
/// assigns the order id and writes it into `delivery` and `audit`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntake {
    pub order: NewOrder,
    pub delivery: Option<NewDelivery>,
    pub audit: NewAuditRecord,
}

#[async_trait]
pub trait TransitionWriter: Send + Sync + 'static {
    /// Applies the status fields, the optional delivery change and the
    /// audit append as one unit: either all of them land or none do.
    /// `Ok(None)` means the order does not exist and nothing was written.
    async fn commit_transition(&self, commit: TransitionCommit)
        -> Result<Option<Order>, RepoError>;

    /// Inserts the order, its delivery row and the audit entry as one unit.
    /// On error no row of the bundle is left behind.
    async fn create_order_bundle(
        &self,
        intake: OrderIntake,
    ) -> Result<(Order, Option<Delivery>), RepoError>;
}

/// The full storage surface the services run against.
pub trait PosStore: OrderStore + DeliveryStore + AuditLog + RiderDirectory + TransitionWriter {}

impl<T> PosStore for T where
    T: OrderStore + DeliveryStore + AuditLog + RiderDirectory + TransitionWriter
{
}
