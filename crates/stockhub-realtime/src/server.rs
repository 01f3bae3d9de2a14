//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use stockhub_core::config::realtime::RealtimeConfig;

use crate::bridge::{BusRouter, NotificationBus};
use crate::connection::registry::ConnectionRegistry;
use crate::connection::sweep;
use crate::metrics::EngineMetrics;

/// Central engine coordinating the connection registry, the bus bridge,
/// and the liveness sweep.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection registry.
    registry: Arc<ConnectionRegistry>,
    /// Bus publisher.
    bus: Arc<dyn NotificationBus>,
    /// Metrics collector.
    metrics: Arc<EngineMetrics>,
    /// This process's instance id, stamped on every published envelope.
    origin: Uuid,
    /// Configuration.
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("origin", &self.origin)
            .finish()
    }
}

impl RealtimeEngine {
    /// Create a new engine around the given bus.
    ///
    /// The metrics handle is shared with the bus implementation so
    /// publish counters and delivery counters land in one place.
    pub fn new(
        config: RealtimeConfig,
        bus: Arc<dyn NotificationBus>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let registry = Arc::new(ConnectionRegistry::new(config.clone(), metrics.clone()));

        info!("Real-time engine initialized");

        Self {
            registry,
            bus,
            metrics,
            origin: Uuid::new_v4(),
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// The local connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The bus publisher.
    pub fn bus(&self) -> &Arc<dyn NotificationBus> {
        &self.bus
    }

    /// Engine metrics.
    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// This process's instance id.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Build the subscriber-side router for this process.
    pub fn router(&self) -> Arc<BusRouter> {
        Arc::new(BusRouter::new(
            self.registry.clone(),
            self.origin,
            self.metrics.clone(),
        ))
    }

    /// A receiver on the engine-wide shutdown signal.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Spawn the periodic liveness sweep.
    pub fn spawn_sweep(&self) -> JoinHandle<()> {
        tokio::spawn(sweep::run_sweep(
            self.registry.clone(),
            self.config.clone(),
            self.shutdown_receiver(),
        ))
    }

    /// Initiate a graceful shutdown: stop background loops and close
    /// every connection.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(true);
        self.registry.close_all();
    }
}
