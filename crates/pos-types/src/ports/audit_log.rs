use async_trait::async_trait;

use crate::domain::audit::{NewAuditRecord, StatusAuditRecord};
use crate::domain::order::OrderId;
use crate::ports::order_store::RepoError;

/// Append-only; there is deliberately no update or delete.
#[async_trait]
pub trait AuditLog: Send + Sync + 'static {
    async fn append(&self, record: NewAuditRecord) -> Result<StatusAuditRecord, RepoError>;
    async fn query_by_order(&self, order_id: OrderId)
        -> Result<Vec<StatusAuditRecord>, RepoError>;
}
