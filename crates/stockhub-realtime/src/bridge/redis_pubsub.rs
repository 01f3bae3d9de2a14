//! Redis pub/sub bridge for multi-process deployments.
//!
//! Two independent logical connections: a multiplexed publishing
//! connection and a dedicated subscribing connection. A subscribed
//! connection cannot issue commands, so they are never shared.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use stockhub_core::config::bus::BusConfig;
use stockhub_core::error::{AppError, ErrorKind};
use stockhub_core::result::AppResult;

use crate::message::envelope::FanoutEnvelope;
use crate::metrics::EngineMetrics;

use super::{BusRouter, NotificationBus};

/// Delay before re-establishing a failed subscriber connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Redis-backed notification bus.
#[derive(Clone)]
pub struct RedisBus {
    /// Publishing connection (pooled, reconnecting).
    publisher: ConnectionManager,
    /// Well-known fan-out channel.
    channel: String,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
}

impl std::fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBus")
            .field("channel", &self.channel)
            .finish()
    }
}

impl RedisBus {
    /// Open the publishing connection.
    pub async fn connect(config: &BusConfig, metrics: Arc<EngineMetrics>) -> AppResult<Self> {
        info!(
            host = %config.host,
            port = config.port,
            db = config.db,
            channel = %config.channel,
            "Connecting to notification bus"
        );

        let client = redis::Client::open(config.url()).map_err(|e| {
            AppError::with_source(ErrorKind::Bus, "Failed to create Redis client", e)
        })?;

        let publisher = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::Bus, "Failed to connect to Redis", e)
        })?;

        info!("Notification bus publisher connected");
        Ok(Self {
            publisher,
            channel: config.channel.clone(),
            metrics,
        })
    }

    /// Spawn the subscriber loop on its own dedicated connection.
    ///
    /// The loop reconnects with a fixed backoff until shutdown; every
    /// received envelope is handed to the router.
    pub fn spawn_subscriber(
        config: BusConfig,
        router: Arc<BusRouter>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if *shutdown.borrow() {
                    break;
                }

                match run_subscriber(&config, &router, &mut shutdown).await {
                    Ok(()) => break,
                    Err(e) => {
                        error!(error = %e, "Bus subscriber failed; reconnecting");
                        tokio::select! {
                            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                            _ = shutdown.changed() => {
                                if *shutdown.borrow() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            info!("Bus subscriber stopped");
        })
    }
}

#[async_trait]
impl NotificationBus for RedisBus {
    async fn publish(&self, envelope: &FanoutEnvelope) -> AppResult<()> {
        let payload = envelope.encode()?;
        let mut conn = self.publisher.clone();

        redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis PUBLISH failed", e))?;

        self.metrics.envelope_published();
        Ok(())
    }
}

/// One subscriber session: connect, subscribe, drain until error or
/// shutdown.
async fn run_subscriber(
    config: &BusConfig,
    router: &BusRouter,
    shutdown: &mut watch::Receiver<bool>,
) -> AppResult<()> {
    let client = redis::Client::open(config.url()).map_err(|e| {
        AppError::with_source(ErrorKind::Bus, "Failed to create Redis client", e)
    })?;

    let mut pubsub = client.get_async_pubsub().await.map_err(|e| {
        AppError::with_source(ErrorKind::Bus, "Failed to open subscriber connection", e)
    })?;

    pubsub.subscribe(&config.channel).await.map_err(|e| {
        AppError::with_source(ErrorKind::Bus, "Failed to subscribe to channel", e)
    })?;

    info!(channel = %config.channel, "Subscribed to notification bus");

    let mut messages = pubsub.on_message();
    loop {
        tokio::select! {
            received = messages.next() => {
                let Some(msg) = received else {
                    return Err(AppError::bus("Subscription stream ended"));
                };
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Non-text payload on bus channel");
                        continue;
                    }
                };
                match FanoutEnvelope::decode(&payload) {
                    Ok(envelope) => {
                        router.route(envelope);
                    }
                    Err(e) => {
                        warn!(error = %e, "Undecodable envelope dropped");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}
