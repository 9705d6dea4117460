#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pos_types::domain::audit::{NewAuditRecord, StatusAuditRecord};
use pos_types::domain::delivery::{Delivery, DeliveryId, DeliveryStatus, NewDelivery};
use pos_types::domain::order::{NewOrder, Order, OrderId, StatusFields};
use pos_types::domain::rider::{Rider, RiderId, RiderPayout};
use pos_types::ports::audit_log::AuditLog;
use pos_types::ports::delivery_store::DeliveryStore;
use pos_types::ports::order_store::{OrderStore, RepoError};
use pos_types::ports::rider_directory::RiderDirectory;
use pos_types::ports::transition::{OrderIntake, TransitionCommit, TransitionWriter};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Storage backend chosen at startup.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Repo::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or("sqlite://pos.db");
        Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // With both backends compiled in, an explicit URL selects SQLite.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Repo::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $call,
        }
    };
}

#[async_trait]
impl OrderStore for Repo {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError> {
        delegate!(self, r => r.create(order).await)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        delegate!(self, r => r.get(id).await)
    }

    async fn get_by_tracking_token(&self, token: &str) -> Result<Option<Order>, RepoError> {
        delegate!(self, r => r.get_by_tracking_token(token).await)
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        delegate!(self, r => r.list().await)
    }

    async fn update_status_fields(
        &self,
        id: OrderId,
        fields: &StatusFields,
    ) -> Result<Option<Order>, RepoError> {
        delegate!(self, r => r.update_status_fields(id, fields).await)
    }

    async fn set_tracking_token(&self, id: OrderId, token: &str) -> Result<bool, RepoError> {
        delegate!(self, r => r.set_tracking_token(id, token).await)
    }
}

#[async_trait]
impl DeliveryStore for Repo {
    async fn create_delivery(&self, delivery: NewDelivery) -> Result<Delivery, RepoError> {
        delegate!(self, r => r.create_delivery(delivery).await)
    }

    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Option<Delivery>, RepoError> {
        delegate!(self, r => r.get_by_order_id(order_id).await)
    }

    async fn update_rider_assignment(
        &self,
        delivery_id: DeliveryId,
        rider_id: RiderId,
        payout: &RiderPayout,
    ) -> Result<bool, RepoError> {
        delegate!(self, r => r.update_rider_assignment(delivery_id, rider_id, payout).await)
    }

    async fn update_delivery_status(
        &self,
        delivery_id: DeliveryId,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        delegate!(self, r => r.update_delivery_status(delivery_id, status, delivered_at).await)
    }
}

#[async_trait]
impl AuditLog for Repo {
    async fn append(&self, record: NewAuditRecord) -> Result<StatusAuditRecord, RepoError> {
        delegate!(self, r => r.append(record).await)
    }

    async fn query_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusAuditRecord>, RepoError> {
        delegate!(self, r => r.query_by_order(order_id).await)
    }
}

#[async_trait]
impl RiderDirectory for Repo {
    async fn get_rider(&self, id: RiderId) -> Result<Option<Rider>, RepoError> {
        delegate!(self, r => r.get_rider(id).await)
    }

    async fn save_rider(&self, rider: Rider) -> Result<Rider, RepoError> {
        delegate!(self, r => r.save_rider(rider).await)
    }
}

#[async_trait]
impl TransitionWriter for Repo {
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<Option<Order>, RepoError> {
        delegate!(self, r => r.commit_transition(commit).await)
    }

    async fn create_order_bundle(
        &self,
        intake: OrderIntake,
    ) -> Result<(Order, Option<Delivery>), RepoError> {
        delegate!(self, r => r.create_order_bundle(intake).await)
    }
}
