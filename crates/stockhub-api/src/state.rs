//! Shared application state threaded through every handler.

use std::sync::Arc;

use stockhub_core::config::AppConfig;
use stockhub_database::DatabasePool;
use stockhub_realtime::RealtimeEngine;
use stockhub_service::{DeliveryService, NotificationQueryService};

/// State available to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Database pool (used by health checks).
    pub db: DatabasePool,
    /// Real-time engine.
    pub engine: Arc<RealtimeEngine>,
    /// Delivery coordinator.
    pub delivery: Arc<DeliveryService>,
    /// Query/read-state service.
    pub queries: Arc<NotificationQueryService>,
}
