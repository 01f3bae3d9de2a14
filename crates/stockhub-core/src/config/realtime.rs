//! Real-time delivery engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time push stream engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Heartbeat interval in seconds (also the sweep cadence).
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Seconds without a client liveness signal before a connection is
    /// considered dead and evicted by the sweep.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    /// Per-connection outbound channel buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum simultaneous connections per user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
}

impl RealtimeConfig {
    /// Heartbeat/sweep cadence as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Connection liveness timeout as a `chrono::Duration`.
    pub fn connection_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.connection_timeout_seconds as i64)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
            connection_timeout_seconds: default_connection_timeout(),
            channel_buffer_size: default_channel_buffer(),
            max_connections_per_user: default_max_connections_per_user(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_connection_timeout() -> u64 {
    90
}

fn default_channel_buffer() -> usize {
    256
}

fn default_max_connections_per_user() -> usize {
    5
}
