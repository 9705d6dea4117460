use async_trait::async_trait;

use crate::domain::rider::{Rider, RiderId};
use crate::ports::order_store::RepoError;

#[async_trait]
pub trait RiderDirectory: Send + Sync + 'static {
    async fn get_rider(&self, id: RiderId) -> Result<Option<Rider>, RepoError>;
    /// Inserts or replaces the rider with the given id.
    async fn save_rider(&self, rider: Rider) -> Result<Rider, RepoError>;
}
