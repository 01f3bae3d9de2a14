//! Thin query/read-state layer over the notification store.
//!
//! Defines the core's consistency contract: the store is the source of
//! truth, every read reflects it at call time, and read-state updates
//! are single conditional statements.

use std::sync::Arc;

use stockhub_core::result::AppResult;
use stockhub_core::types::id::NotificationId;
use stockhub_core::types::pagination::{PageRequest, PageResponse};
use stockhub_entity::notification::{Notification, NotificationFilter, UnreadCounts};

use crate::context::RequestContext;

use super::store::NotificationStore;

/// Read-side service for a user's notifications.
#[derive(Clone)]
pub struct NotificationQueryService {
    /// Durable notification record.
    store: Arc<dyn NotificationStore>,
}

impl std::fmt::Debug for NotificationQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueryService").finish()
    }
}

impl NotificationQueryService {
    /// Create a new query service.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// List the caller's visible notifications, newest first.
    ///
    /// Visible means addressed to the caller or broadcast to their
    /// tenant, and not expired.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        filter: &NotificationFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        self.store
            .find_for_user(ctx.tenant_id, ctx.user_id, filter, page)
            .await
    }

    /// Mark one notification as read, or everything currently unread
    /// when no id is given. Returns how many rows transitioned.
    ///
    /// Both forms are single conditional updates: repeating a call is a
    /// no-op, and a notification created while a bulk call runs is never
    /// retroactively marked.
    pub async fn mark_read(
        &self,
        ctx: &RequestContext,
        notification_id: Option<NotificationId>,
    ) -> AppResult<u64> {
        match notification_id {
            Some(id) => {
                let transitioned = self.store.mark_read(ctx.tenant_id, ctx.user_id, id).await?;
                Ok(u64::from(transitioned))
            }
            None => self.store.mark_all_read(ctx.tenant_id, ctx.user_id).await,
        }
    }

    /// Aggregate unread counts, computed from the store at call time.
    pub async fn unread_count(&self, ctx: &RequestContext) -> AppResult<UnreadCounts> {
        self.store.count_unread(ctx.tenant_id, ctx.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::test_support::MemoryStore;
    use chrono::{Duration, Utc};
    use stockhub_core::types::id::{TenantId, UserId};
    use stockhub_entity::notification::{
        NewNotification, NotificationKind, NotificationPriority,
    };

    fn content(kind: NotificationKind, priority: NotificationPriority) -> NewNotification {
        NewNotification {
            kind,
            category: None,
            priority,
            title: "Title".to_string(),
            message: "Body".to_string(),
            payload: None,
            expires_at: None,
        }
    }

    async fn seed(
        store: &MemoryStore,
        tenant: TenantId,
        user: Option<UserId>,
        kind: NotificationKind,
        priority: NotificationPriority,
    ) -> Notification {
        let n = content(kind, priority)
            .materialize(tenant, user, None, Utc::now(), None)
            .unwrap();
        NotificationStore::insert(store, &n).await.unwrap();
        n
    }

    #[tokio::test]
    async fn test_list_includes_broadcasts_and_own_rows_only() {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new();
        let user = UserId::new();
        let stranger = UserId::new();

        seed(&store, tenant, Some(user), NotificationKind::System, NotificationPriority::Normal).await;
        seed(&store, tenant, None, NotificationKind::System, NotificationPriority::Normal).await;
        seed(&store, tenant, Some(stranger), NotificationKind::System, NotificationPriority::Normal).await;

        let svc = NotificationQueryService::new(store);
        let ctx = RequestContext::new(tenant, user);
        let page = svc
            .list(&ctx, &NotificationFilter::default(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_items, 2);
    }

    #[tokio::test]
    async fn test_mark_read_single_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new();
        let user = UserId::new();
        let n = seed(&store, tenant, Some(user), NotificationKind::Ticket, NotificationPriority::Normal).await;

        let svc = NotificationQueryService::new(store.clone());
        let ctx = RequestContext::new(tenant, user);

        assert_eq!(svc.mark_read(&ctx, Some(n.id)).await.unwrap(), 1);
        let read_at = store.get(n.id).unwrap().read_at.unwrap();

        // Second call transitions nothing and leaves read_at untouched.
        assert_eq!(svc.mark_read(&ctx, Some(n.id)).await.unwrap(), 0);
        let row = store.get(n.id).unwrap();
        assert!(row.is_read);
        assert_eq!(row.read_at, Some(read_at));
    }

    #[tokio::test]
    async fn test_mark_all_read_spares_later_rows() {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new();
        let user = UserId::new();
        seed(&store, tenant, Some(user), NotificationKind::System, NotificationPriority::Normal).await;
        seed(&store, tenant, Some(user), NotificationKind::System, NotificationPriority::Normal).await;

        let svc = NotificationQueryService::new(store.clone());
        let ctx = RequestContext::new(tenant, user);
        assert_eq!(svc.mark_read(&ctx, None).await.unwrap(), 2);

        // A row arriving after the bulk call stays unread.
        let late = seed(&store, tenant, Some(user), NotificationKind::System, NotificationPriority::Normal).await;
        assert!(store.get(late.id).unwrap().is_unread());
    }

    #[tokio::test]
    async fn test_unread_count_matches_unread_only_list() {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new();
        let user = UserId::new();

        seed(&store, tenant, Some(user), NotificationKind::Ticket, NotificationPriority::High).await;
        seed(&store, tenant, Some(user), NotificationKind::Workflow, NotificationPriority::Urgent).await;
        seed(&store, tenant, None, NotificationKind::System, NotificationPriority::Normal).await;

        let svc = NotificationQueryService::new(store.clone());
        let ctx = RequestContext::new(tenant, user);

        let counts = svc.unread_count(&ctx).await.unwrap();
        let filter = NotificationFilter {
            unread_only: true,
            ..NotificationFilter::default()
        };
        let unread_list = svc.list(&ctx, &filter, &PageRequest::default()).await.unwrap();

        assert_eq!(counts.total as u64, unread_list.total_items);
        assert_eq!(counts.high_priority, 1);
        assert_eq!(counts.urgent, 1);
        assert_eq!(counts.by_kind.get("ticket"), Some(&1));
        assert_eq!(counts.by_kind.get("workflow"), Some(&1));
        assert_eq!(counts.by_kind.get("system"), Some(&1));
    }

    #[tokio::test]
    async fn test_expired_rows_invisible_to_list_and_counts() {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new();
        let user = UserId::new();

        let past = Utc::now() - Duration::hours(2);
        let expired = content(NotificationKind::System, NotificationPriority::Normal)
            .materialize(tenant, Some(user), None, past, Some(Duration::hours(1)))
            .unwrap();
        NotificationStore::insert(store.as_ref(), &expired).await.unwrap();
        seed(&store, tenant, Some(user), NotificationKind::System, NotificationPriority::Normal).await;

        let svc = NotificationQueryService::new(store);
        let ctx = RequestContext::new(tenant, user);

        let page = svc
            .list(&ctx, &NotificationFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(svc.unread_count(&ctx).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let tenant = TenantId::new();
        let user = UserId::new();

        let older = content(NotificationKind::System, NotificationPriority::Normal)
            .materialize(tenant, Some(user), None, Utc::now() - Duration::seconds(10), None)
            .unwrap();
        let newer = content(NotificationKind::System, NotificationPriority::Normal)
            .materialize(tenant, Some(user), None, Utc::now(), None)
            .unwrap();
        // Insert out of order; the listing sorts by creation time.
        NotificationStore::insert(store.as_ref(), &newer).await.unwrap();
        NotificationStore::insert(store.as_ref(), &older).await.unwrap();

        let svc = NotificationQueryService::new(store);
        let ctx = RequestContext::new(tenant, user);
        let page = svc
            .list(&ctx, &NotificationFilter::default(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.items[0].id, newer.id);
        assert_eq!(page.items[1].id, older.id);
    }
}
