//! Cron scheduler for maintenance jobs.

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use stockhub_core::error::AppError;
use stockhub_core::result::AppResult;

use crate::jobs::ExpiryCleanupJob;

/// Owns the cron scheduler and its registered jobs.
pub struct WorkerScheduler {
    scheduler: JobScheduler,
}

impl WorkerScheduler {
    /// Build the scheduler and register the cleanup job on the given
    /// cron expression.
    pub async fn start(cleanup: ExpiryCleanupJob, cleanup_cron: &str) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Scheduler init failed: {e}")))?;

        let job = Job::new_async(cleanup_cron, move |_id, _lock| {
            let cleanup = cleanup.clone();
            Box::pin(async move {
                cleanup.run_logged().await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cleanup cron expression: {e}"))
        })?;

        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to register cleanup job: {e}")))?;

        scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!(cron = %cleanup_cron, "Worker scheduler started");
        Ok(Self { scheduler })
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler shutdown failed");
        }
    }
}
