pub mod health_check;
pub mod order_events;
pub mod order_service;
pub mod status_service;
pub mod tracking;

use crate::config::Config;
use health_check::HealthCheckService;
use order_events::OrderEventsDispatcher;
use order_service::{EtaDefaults, OrderService};
use pos_types::ports::clock::{Clock, SystemClock};
use pos_types::ports::random::{OsRandom, RandomSource};
use pos_types::ports::transition::PosStore;
use status_service::OrderStatusService;
use std::sync::Arc;
use tracking::TrackingService;

/// Every service wired against one store, clock and random source.
pub struct PosServices<S: PosStore> {
    pub orders: OrderService<S>,
    pub status: OrderStatusService<S>,
    pub events: OrderEventsDispatcher<S>,
    pub tracking: TrackingService<S>,
    pub health: HealthCheckService<S>,
}

impl<S: PosStore> Clone for PosServices<S> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            status: self.status.clone(),
            events: self.events.clone(),
            tracking: self.tracking.clone(),
            health: self.health.clone(),
        }
    }
}

impl<S: PosStore> PosServices<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        config: &Config,
    ) -> Self {
        let eta = EtaDefaults {
            cooking_minutes: config.default_cooking_eta_minutes,
            delivery_minutes: config.default_delivery_eta_minutes,
        };
        Self {
            orders: OrderService::new(store.clone(), clock.clone(), random.clone(), eta),
            status: OrderStatusService::new(store.clone(), clock.clone()),
            events: OrderEventsDispatcher::new(store.clone(), clock.clone()),
            tracking: TrackingService::new(store.clone(), random, config.token_max_attempts),
            health: HealthCheckService::new(store, clock),
        }
    }

    /// Wall clock and OS randomness.
    pub fn with_system_defaults(store: S, config: &Config) -> Self {
        Self::new(
            Arc::new(store),
            Arc::new(SystemClock),
            Arc::new(OsRandom),
            config,
        )
    }
}
