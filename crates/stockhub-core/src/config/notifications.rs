//! Notification lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Notification persistence lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Default expiry applied to notifications created without an
    /// explicit expiry, in days. `0` disables the default expiry.
    #[serde(default = "default_expiry_days")]
    pub default_expiry_days: i64,
    /// Cron expression driving the expired-notification cleanup job.
    #[serde(default = "default_cleanup_cron")]
    pub cleanup_cron: String,
}

impl NotificationsConfig {
    /// Default expiry as a `chrono::Duration`, `None` when disabled.
    pub fn default_expiry(&self) -> Option<chrono::Duration> {
        if self.default_expiry_days > 0 {
            Some(chrono::Duration::days(self.default_expiry_days))
        } else {
            None
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: default_expiry_days(),
            cleanup_cron: default_cleanup_cron(),
        }
    }
}

fn default_expiry_days() -> i64 {
    30
}

fn default_cleanup_cron() -> String {
    // Hourly, on the hour (sec min hour day month weekday).
    "0 0 * * * *".to_string()
}
