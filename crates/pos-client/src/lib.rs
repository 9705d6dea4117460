use std::time::Duration;

use anyhow::Context;
use pos_types::domain::audit::{Source, StatusAuditRecord};
use pos_types::domain::delivery::Delivery;
use pos_types::domain::event::OrderEvent;
use pos_types::domain::order::{Order, OrderDraft, OrderId, UserId};
use pos_types::domain::rider::{RiderId, RiderPayout};
use pos_types::domain::status::{LifecycleField, OrderStatus, StoredStatus};
use pos_types::domain::tracking::OrderView;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct PosClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct PosClient {
    base: Url,
    client: reqwest::Client,
}

impl PosClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<PosClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(PosClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        tracing::debug!(path, "GET");
        let res = self
            .client
            .get(self.url(path)?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> anyhow::Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(path, "POST");
        let res = self
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn create_order(&self, req: CreateOrderRequest) -> anyhow::Result<CreatedOrder> {
        self.post_json("orders", &req).await
    }

    pub async fn get_order(&self, id: OrderId) -> anyhow::Result<Order> {
        self.get_json(&format!("orders/{id}")).await
    }

    pub async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
        self.get_json("orders").await
    }

    pub async fn update_status(
        &self,
        id: OrderId,
        req: UpdateStatusRequest,
    ) -> anyhow::Result<StatusChange> {
        self.post_json(&format!("orders/{id}/status"), &req).await
    }

    pub async fn dispatch_event(
        &self,
        id: OrderId,
        req: DispatchEventRequest,
    ) -> anyhow::Result<EventResult> {
        self.post_json(&format!("orders/{id}/events"), &req).await
    }

    pub async fn order_history(&self, id: OrderId) -> anyhow::Result<Vec<StatusAuditRecord>> {
        self.get_json(&format!("orders/{id}/history")).await
    }

    /// Returns the order's tracking token, issuing one on first call.
    pub async fn tracking_token(&self, id: OrderId) -> anyhow::Result<TrackingToken> {
        let path = format!("orders/{id}/tracking-token");
        tracing::debug!(path = %path, "POST");
        let res = self
            .client
            .post(self.url(&path)?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn track(&self, token: &str) -> anyhow::Result<OrderView> {
        self.get_json(&format!("track/{token}")).await
    }

    pub async fn health_check(&self) -> anyhow::Result<Vec<HealthIssue>> {
        self.get_json("maintenance/health-check").await
    }

    pub async fn auto_repair(&self, dry_run: bool) -> anyhow::Result<RepairSummary> {
        self.post_json("maintenance/auto-repair", &AutoRepairRequest { dry_run })
            .await
    }
}

impl PosClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<PosClient> {
        if let Some(client) = self.client {
            return Ok(PosClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(PosClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateOrderRequest {
    pub source: Source,
    pub actor_user_id: UserId,
    #[serde(flatten)]
    pub draft: OrderDraft,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub order: Order,
    pub delivery: Option<Delivery>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub source: Source,
    pub actor_user_id: UserId,
    #[serde(default)]
    pub force: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdateStatusRequest {
    pub fn new(status: OrderStatus, source: Source, actor_user_id: UserId) -> Self {
        Self {
            status,
            source,
            actor_user_id,
            force: false,
            notes: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DispatchEventRequest {
    pub event: OrderEvent,
    pub source: Source,
    pub actor_user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_id: Option<RiderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub force: bool,
}

impl DispatchEventRequest {
    pub fn new(event: OrderEvent, source: Source, actor_user_id: UserId) -> Self {
        Self {
            event,
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
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub success: bool,
    pub message: String,
    pub order_id: OrderId,
    pub old_status: StoredStatus,
    pub new_status: OrderStatus,
    pub changed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventResult {
    pub event: OrderEvent,
    #[serde(flatten)]
    pub change: StatusChange,
    #[serde(default)]
    pub rider_id: Option<RiderId>,
    #[serde(default)]
    pub payout: Option<RiderPayout>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackingToken {
    pub order_id: OrderId,
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthIssue {
    pub order_id: OrderId,
    pub issue_type: String,
    pub status: String,
    pub missing_field: Option<LifecycleField>,
}

/// Counters of an auto-repair run; per-issue details are not decoded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepairSummary {
    pub dry_run: bool,
    pub checked: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AutoRepairRequest {
    dry_run: bool,
}
