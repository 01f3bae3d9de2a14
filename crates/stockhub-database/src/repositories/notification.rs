//! Notification repository implementation.

use chrono::Utc;
use sqlx::PgPool;

use stockhub_core::error::{AppError, ErrorKind};
use stockhub_core::result::AppResult;
use stockhub_core::types::id::{NotificationId, TenantId, UserId};
use stockhub_core::types::pagination::{PageRequest, PageResponse};
use stockhub_entity::notification::{
    Notification, NotificationFilter, UnreadCounts,
};

/// Visibility predicate shared by all per-user queries: a user sees their
/// own rows plus tenant-wide broadcasts, never expired rows.
const VISIBLE: &str = "tenant_id = $1 AND (user_id = $2 OR user_id IS NULL) \
     AND (expires_at IS NULL OR expires_at > NOW())";

/// Repository for notification persistence.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a single notification.
    pub async fn insert(&self, n: &Notification) -> AppResult<()> {
        insert_one(&self.pool, n).await
    }

    /// Insert a batch of notifications in one transaction.
    pub async fn insert_many(&self, notifications: &[Notification]) -> AppResult<()> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        for n in notifications {
            insert_one(&mut *tx, n).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit notifications", e)
        })?;
        Ok(())
    }

    /// List visible notifications for a user, newest first.
    pub async fn find_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        filter: &NotificationFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        let kind = filter.kind.map(|k| k.as_str());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notifications WHERE {VISIBLE} \
             AND ($3::boolean IS FALSE OR is_read = FALSE) \
             AND ($4::text IS NULL OR kind = $4) \
             AND ($5::timestamptz IS NULL OR created_at >= $5) \
             AND ($6::timestamptz IS NULL OR created_at <= $6)"
        ))
        .bind(tenant_id)
        .bind(user_id)
        .bind(filter.unread_only)
        .bind(kind)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count notifications", e)
        })?;

        let items = sqlx::query_as::<_, Notification>(&format!(
            "SELECT * FROM notifications WHERE {VISIBLE} \
             AND ($3::boolean IS FALSE OR is_read = FALSE) \
             AND ($4::text IS NULL OR kind = $4) \
             AND ($5::timestamptz IS NULL OR created_at >= $5) \
             AND ($6::timestamptz IS NULL OR created_at <= $6) \
             ORDER BY created_at DESC LIMIT $7 OFFSET $8"
        ))
        .bind(tenant_id)
        .bind(user_id)
        .bind(filter.unread_only)
        .bind(kind)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list notifications", e)
        })?;

        Ok(PageResponse::new(
            items,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    /// Mark a single notification as read.
    ///
    /// Conditional on `is_read = FALSE`, so repeating the call leaves
    /// `read_at` untouched. Returns whether a row transitioned.
    pub async fn mark_read(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
             WHERE tenant_id = $1 AND id = $2 \
             AND (user_id = $3 OR user_id IS NULL) \
             AND is_read = FALSE",
        )
        .bind(tenant_id)
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every notification that is unread at statement execution as
    /// read, in one conditional update. Rows created after the statement's
    /// snapshot are unaffected.
    pub async fn mark_all_read(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
             WHERE tenant_id = $1 AND (user_id = $2 OR user_id IS NULL) \
             AND is_read = FALSE",
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark all read", e))?;

        Ok(result.rows_affected())
    }

    /// Aggregate unread counts for a user. Always reflects the store at
    /// call time; no caching.
    pub async fn count_unread(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<UnreadCounts> {
        let (total, high_priority, urgent): (i64, i64, i64) = sqlx::query_as(&format!(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE priority = 'high'), \
                    COUNT(*) FILTER (WHERE priority = 'urgent') \
             FROM notifications WHERE {VISIBLE} AND is_read = FALSE"
        ))
        .bind(tenant_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))?;

        let by_kind: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT kind, COUNT(*) FROM notifications \
             WHERE {VISIBLE} AND is_read = FALSE GROUP BY kind"
        ))
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count unread by kind", e)
        })?;

        Ok(UnreadCounts {
            total,
            by_kind: by_kind.into_iter().collect(),
            high_priority,
            urgent,
        })
    }

    /// Delete notifications whose expiry has passed. Returns the number
    /// of rows removed.
    pub async fn delete_expired(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications \
             WHERE expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete expired", e)
        })?;

        Ok(result.rows_affected())
    }
}

async fn insert_one<'e, E>(executor: E, n: &Notification) -> AppResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO notifications \
         (id, tenant_id, user_id, role_code, kind, category, priority, \
          title, message, payload, is_read, read_at, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(n.id)
    .bind(n.tenant_id)
    .bind(n.user_id)
    .bind(&n.role_code)
    .bind(n.kind.as_str())
    .bind(&n.category)
    .bind(n.priority.as_str())
    .bind(&n.title)
    .bind(&n.message)
    .bind(&n.payload)
    .bind(n.is_read)
    .bind(n.read_at)
    .bind(n.created_at)
    .bind(n.expires_at)
    .execute(executor)
    .await
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to insert notification", e)
    })?;
    Ok(())
}
