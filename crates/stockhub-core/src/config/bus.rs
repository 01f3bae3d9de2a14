//! Message bus (Redis pub/sub) configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the shared notification bus.
///
/// The bridge opens two independent logical connections from these
/// settings: one dedicated to publishing and one dedicated to
/// subscribing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Whether the external bus is enabled. When disabled the process
    /// falls back to in-memory fan-out (single-node mode).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Redis host.
    #[serde(default = "default_bus_host")]
    pub host: String,
    /// Redis port.
    #[serde(default = "default_bus_port")]
    pub port: u16,
    /// Optional Redis password.
    #[serde(default)]
    pub password: Option<String>,
    /// Logical Redis database index.
    #[serde(default)]
    pub db: i64,
    /// Well-known pub/sub channel carrying fan-out envelopes.
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl BusConfig {
    /// Build the Redis connection URL from the individual settings.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_bus_host(),
            port: default_bus_port(),
            password: None,
            db: 0,
            channel: default_channel(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_bus_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bus_port() -> u16 {
    6379
}

fn default_channel() -> String {
    "stockhub:notifications".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_without_password() {
        let config = BusConfig::default();
        assert_eq!(config.url(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn test_url_with_password_and_db() {
        let config = BusConfig {
            password: Some("s3cret".to_string()),
            db: 2,
            ..BusConfig::default()
        };
        assert_eq!(config.url(), "redis://:s3cret@127.0.0.1:6379/2");
    }
}
