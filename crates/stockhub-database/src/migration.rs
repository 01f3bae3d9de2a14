//! Embedded schema migrations.
//!
//! Statements are executed in order and are individually idempotent, so
//! running them on every startup is safe.

use sqlx::PgPool;
use tracing::info;

use stockhub_core::error::{AppError, ErrorKind};
use stockhub_core::result::AppResult;

/// Schema statements, applied in order on startup.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS notifications (
        id          UUID PRIMARY KEY,
        tenant_id   UUID NOT NULL,
        user_id     UUID,
        role_code   TEXT,
        kind        TEXT NOT NULL,
        category    TEXT,
        priority    TEXT NOT NULL,
        title       TEXT NOT NULL,
        message     TEXT NOT NULL,
        payload     JSONB,
        is_read     BOOLEAN NOT NULL DEFAULT FALSE,
        read_at     TIMESTAMPTZ,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        expires_at  TIMESTAMPTZ,
        CONSTRAINT notifications_expiry_after_creation
            CHECK (expires_at IS NULL OR expires_at > created_at),
        CONSTRAINT notifications_read_at_consistent
            CHECK (is_read = (read_at IS NOT NULL))
    )",
    "CREATE INDEX IF NOT EXISTS idx_notifications_tenant_user_created
        ON notifications (tenant_id, user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_tenant_unread
        ON notifications (tenant_id, is_read)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_expires_at
        ON notifications (expires_at)
        WHERE expires_at IS NOT NULL",
];

/// Apply all pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    for (idx, statement) in MIGRATIONS.iter().enumerate() {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Migration statement {idx} failed"),
                e,
            )
        })?;
    }

    info!(statements = MIGRATIONS.len(), "Database migrations applied");
    Ok(())
}
