//! The narrow store interface the notification services depend on.

use async_trait::async_trait;

use stockhub_core::result::AppResult;
use stockhub_core::types::id::{NotificationId, TenantId, UserId};
use stockhub_core::types::pagination::{PageRequest, PageResponse};
use stockhub_database::repositories::NotificationRepository;
use stockhub_entity::notification::{Notification, NotificationFilter, UnreadCounts};

/// Narrow interface over the durable notification record.
///
/// Services never reach past this trait into the persistence engine.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Insert a single notification.
    async fn insert(&self, notification: &Notification) -> AppResult<()>;

    /// Insert a batch of notifications atomically.
    async fn insert_many(&self, notifications: &[Notification]) -> AppResult<()>;

    /// List visible notifications for a user, newest first.
    async fn find_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        filter: &NotificationFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Notification>>;

    /// Mark one notification read; returns whether a row transitioned.
    async fn mark_read(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<bool>;

    /// Mark everything unread at statement time as read; returns the
    /// number of rows updated.
    async fn mark_all_read(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<u64>;

    /// Aggregate unread counts for a user.
    async fn count_unread(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<UnreadCounts>;

    /// Delete expired notifications; returns the number removed.
    async fn delete_expired(&self) -> AppResult<u64>;
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        NotificationRepository::insert(self, notification).await
    }

    async fn insert_many(&self, notifications: &[Notification]) -> AppResult<()> {
        NotificationRepository::insert_many(self, notifications).await
    }

    async fn find_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        filter: &NotificationFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        NotificationRepository::find_for_user(self, tenant_id, user_id, filter, page).await
    }

    async fn mark_read(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<bool> {
        NotificationRepository::mark_read(self, tenant_id, user_id, notification_id).await
    }

    async fn mark_all_read(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<u64> {
        NotificationRepository::mark_all_read(self, tenant_id, user_id).await
    }

    async fn count_unread(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<UnreadCounts> {
        NotificationRepository::count_unread(self, tenant_id, user_id).await
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        NotificationRepository::delete_expired(self).await
    }
}
