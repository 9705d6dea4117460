use async_trait::async_trait;

use crate::domain::order::{NewOrder, Order, OrderId, StatusFields};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError>;
    async fn get_by_tracking_token(&self, token: &str) -> Result<Option<Order>, RepoError>;
    async fn list(&self) -> Result<Vec<Order>, RepoError>;

    /// Plain column write with no audit record. Lifecycle changes go
    /// through [`crate::ports::transition::TransitionWriter`] instead.
    async fn update_status_fields(
        &self,
        id: OrderId,
        fields: &StatusFields,
    ) -> Result<Option<Order>, RepoError>;

    /// Returns `false` when the order does not exist and
    /// `RepoError::Conflict` when another order already holds the token.
    async fn set_tracking_token(&self, id: OrderId, token: &str) -> Result<bool, RepoError>;
}
