//! Periodic liveness sweep task.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use stockhub_core::config::realtime::RealtimeConfig;

use super::registry::ConnectionRegistry;

/// Run the sweep loop until shutdown.
///
/// One interval drives both heartbeat emission and timeout checks; the
/// timeout clock is only reset by client liveness signals, so it
/// genuinely fires for half-open streams.
pub async fn run_sweep(
    registry: Arc<ConnectionRegistry>,
    config: RealtimeConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(config.heartbeat_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = registry.sweep(Utc::now(), config.connection_timeout());
                if outcome.evicted > 0 {
                    info!(
                        evicted = outcome.evicted,
                        heartbeats = outcome.heartbeats,
                        "Sweep evicted dead connections"
                    );
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Sweep loop stopped");
}
