//! Public tracking tokens: issuing them and resolving them to the
//! customer-safe order view.

use crate::errors::AppError;
use pos_types::domain::order::{OrderId, OrderType};
use pos_types::domain::tracking::OrderView;
use pos_types::ports::delivery_store::DeliveryStore;
use pos_types::ports::order_store::{OrderStore, RepoError};
use pos_types::ports::random::RandomSource;
use pos_types::ports::rider_directory::RiderDirectory;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// 16 bytes, rendered as 32 lowercase hex characters.
pub const TOKEN_BYTES: usize = 16;

fn token_format() -> &'static Regex {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    FORMAT.get_or_init(|| Regex::new(r"^[a-f0-9]{16,64}$").expect("static regex"))
}

pub fn is_well_formed_token(token: &str) -> bool {
    token_format().is_match(token)
}

pub struct TrackingService<S> {
    store: Arc<S>,
    random: Arc<dyn RandomSource>,
    max_attempts: u32,
}

impl<S> Clone for TrackingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            random: self.random.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S> TrackingService<S>
where
    S: OrderStore + DeliveryStore + RiderDirectory,
{
    pub fn new(store: Arc<S>, random: Arc<dyn RandomSource>, max_attempts: u32) -> Self {
        Self {
            store,
            random,
            max_attempts: max_attempts.max(1),
        }
    }

    fn new_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.random.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issues a fresh token for the order, replacing any previous one.
    ///
    /// Collisions are retried; a readback that does not match what was
    /// written is a hard failure and is not retried.
    pub async fn generate_token(&self, order_id: OrderId) -> Result<String, AppError> {
        if self.store.get(order_id).await?.is_none() {
            return Err(AppError::NotFound(format!("order {}", order_id)));
        }

        for attempt in 1..=self.max_attempts {
            let token = self.new_token();
            if self.store.get_by_tracking_token(&token).await?.is_some() {
                warn!(order_id, attempt, "tracking token collision");
                continue;
            }
            match self.store.set_tracking_token(order_id, &token).await {
                Ok(true) => {}
                Ok(false) => return Err(AppError::NotFound(format!("order {}", order_id))),
                Err(RepoError::Conflict(reason)) => {
                    warn!(order_id, attempt, %reason, "tracking token rejected by store");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let persisted = self
                .store
                .get(order_id)
                .await?
                .and_then(|o| o.tracking_token);
            if persisted.as_deref() != Some(token.as_str()) {
                warn!(order_id, "tracking token readback mismatch");
                return Err(AppError::VerificationFailure(format!(
                    "tracking token for order {} did not persist",
                    order_id
                )));
            }
            info!(order_id, "tracking token issued");
            return Ok(token);
        }

        Err(AppError::StorageFailure(format!(
            "no unique tracking token after {} attempts",
            self.max_attempts
        )))
    }

    /// Returns the order's token, issuing one if it has none yet.
    pub async fn ensure_token(&self, order_id: OrderId) -> Result<String, AppError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))?;
        match order.tracking_token {
            Some(token) => Ok(token),
            None => self.generate_token(order_id).await,
        }
    }

    pub async fn resolve_token(&self, token: &str) -> Result<OrderView, AppError> {
        if !is_well_formed_token(token) {
            return Err(AppError::InvalidInput("malformed tracking token".into()));
        }
        let order = self
            .store
            .get_by_tracking_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("tracking token".into()))?;

        let delivery = match order.order_type {
            OrderType::Delivery => self.store.get_by_order_id(order.id).await?,
            OrderType::DineIn | OrderType::Takeaway => None,
        };
        let rider = match delivery.as_ref().and_then(|d| d.assigned_rider_id) {
            Some(rider_id) => self.store.get_rider(rider_id).await?,
            None => None,
        };
        Ok(OrderView::project(&order, delivery.as_ref(), rider.as_ref()))
    }
}
