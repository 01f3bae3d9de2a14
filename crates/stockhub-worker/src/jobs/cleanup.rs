//! Expired-notification cleanup job.

use std::sync::Arc;

use tracing::{error, info};

use stockhub_core::result::AppResult;
use stockhub_database::repositories::NotificationRepository;

/// Deletes notifications whose expiry has passed.
///
/// Expiry is deletion, not mutation: once a row's `expires_at` is in the
/// past it is invisible to every query, so removing it changes nothing a
/// client can observe.
#[derive(Debug, Clone)]
pub struct ExpiryCleanupJob {
    /// Notification repository.
    repo: Arc<NotificationRepository>,
}

impl ExpiryCleanupJob {
    /// Create a new cleanup job.
    pub fn new(repo: Arc<NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Run one cleanup pass.
    pub async fn run(&self) -> AppResult<u64> {
        let removed = self.repo.delete_expired().await?;
        if removed > 0 {
            info!(removed, "Expired notifications removed");
        }
        Ok(removed)
    }

    /// Run one pass, absorbing the error into a log line. Used by the
    /// scheduler, which has no caller to propagate to.
    pub async fn run_logged(&self) {
        if let Err(e) = self.run().await {
            error!(error = %e, "Notification cleanup failed");
        }
    }
}
