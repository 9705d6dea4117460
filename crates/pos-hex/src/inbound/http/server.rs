use axum::{
    extract::{Path, State},
    routing::{get, post},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::health_check::{Issue, RepairReport};
use crate::application::order_events::{DispatchOptions, EventOutcome};
use crate::application::order_service::CreatedOrder;
use crate::application::status_service::{TransitionOptions, TransitionOutcome};
use crate::application::PosServices;
use crate::errors::AppError;
use pos_types::domain::audit::{Source, StatusAuditRecord};
use pos_types::domain::order::{Order, OrderDraft, OrderId, UserId};
use pos_types::domain::tracking::OrderView;
use pos_types::ports::transition::PosStore;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

#[derive(Clone)]
pub struct HttpServer<R>
where
    R: PosStore,
{
    pub services: Arc<PosServices<R>>,
    pub config: HttpServerConfig,
}

#[derive(Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub source: Source,
    pub actor_user_id: UserId,
    #[serde(flatten)]
    pub draft: OrderDraft,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub source: Source,
    pub actor_user_id: UserId,
    #[serde(flatten)]
    pub options: TransitionOptions,
}

#[derive(Serialize, Deserialize)]
pub struct DispatchEventRequest {
    pub event: String,
    #[serde(flatten)]
    pub options: DispatchOptions,
}

#[derive(Serialize, Deserialize)]
pub struct TrackingTokenResponse {
    pub order_id: OrderId,
    pub token: String,
}

#[derive(Serialize, Deserialize, Default)]
pub struct AutoRepairRequest {
    #[serde(default)]
    pub dry_run: bool,
}

type Services<R> = State<Arc<PosServices<R>>>;

fn parse_id(raw: &str) -> Result<OrderId, AppError> {
    raw.parse::<OrderId>()
        .map_err(|e| AppError::InvalidInput(format!("order id {:?}: {}", raw, e)))
}

impl<R> HttpServer<R>
where
    R: PosStore,
{
    pub async fn new(services: PosServices<R>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            services: Arc::new(services),
            config,
        })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/orders", post(create_order::<R>).get(list_orders::<R>))
            .route("/orders/{id}", get(get_order::<R>))
            .route("/orders/{id}/status", post(update_status::<R>))
            .route("/orders/{id}/events", post(dispatch_event::<R>))
            .route("/orders/{id}/history", get(order_history::<R>))
            .route("/orders/{id}/tracking-token", post(issue_token::<R>))
            .route("/track/{token}", get(track::<R>))
            .route("/maintenance/health-check", get(health_check::<R>))
            .route("/maintenance/auto-repair", post(auto_repair::<R>))
            .layer(trace_layer)
            // Tracking pages are served from other origins.
            .layer(CorsLayer::permissive())
            .with_state(self.services.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn create_order<R: PosStore>(
    State(services): Services<R>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<CreatedOrder>), AppError> {
    let created = services
        .orders
        .create_order(payload.draft, payload.source, payload.actor_user_id)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_orders<R: PosStore>(
    State(services): Services<R>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(services.orders.list_orders().await?))
}

async fn get_order<R: PosStore>(
    State(services): Services<R>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = services.orders.get_order(parse_id(&id)?).await?;
    Ok(Json(order))
}

async fn update_status<R: PosStore>(
    State(services): Services<R>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let outcome = services
        .status
        .transition_status_raw(
            parse_id(&id)?,
            &payload.status,
            payload.source,
            payload.actor_user_id,
            payload.options,
        )
        .await?;
    Ok(Json(outcome))
}

async fn dispatch_event<R: PosStore>(
    State(services): Services<R>,
    Path(id): Path<String>,
    Json(payload): Json<DispatchEventRequest>,
) -> Result<Json<EventOutcome>, AppError> {
    let outcome = services
        .events
        .dispatch_raw(parse_id(&id)?, &payload.event, payload.options)
        .await?;
    Ok(Json(outcome))
}

async fn order_history<R: PosStore>(
    State(services): Services<R>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusAuditRecord>>, AppError> {
    Ok(Json(services.orders.order_history(parse_id(&id)?).await?))
}

async fn issue_token<R: PosStore>(
    State(services): Services<R>,
    Path(id): Path<String>,
) -> Result<Json<TrackingTokenResponse>, AppError> {
    let order_id = parse_id(&id)?;
    let token = services.tracking.ensure_token(order_id).await?;
    Ok(Json(TrackingTokenResponse { order_id, token }))
}

async fn track<R: PosStore>(
    State(services): Services<R>,
    Path(token): Path<String>,
) -> Result<Json<OrderView>, AppError> {
    Ok(Json(services.tracking.resolve_token(&token).await?))
}

async fn health_check<R: PosStore>(
    State(services): Services<R>,
) -> Result<Json<Vec<Issue>>, AppError> {
    Ok(Json(services.health.health_check().await?))
}

async fn auto_repair<R: PosStore>(
    State(services): Services<R>,
    Json(payload): Json<AutoRepairRequest>,
) -> Result<Json<RepairReport>, AppError> {
    Ok(Json(services.health.auto_repair(payload.dry_run).await?))
}
