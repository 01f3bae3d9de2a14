//! Delivery coordinator: the single entry point collaborators call to
//! send a notification.
//!
//! Owns the persist-then-fan-out sequence and its partial-failure
//! policy: a store failure is fatal to the call, while bus and local
//! push failures only degrade real-time delivery. The durable record
//! already exists at that point, so recipients see it on their next
//! list.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use stockhub_core::error::AppError;
use stockhub_core::result::AppResult;
use stockhub_core::types::id::{TenantId, UserId};
use stockhub_entity::notification::NewNotification;
use stockhub_entity::Notification;
use stockhub_realtime::bridge::NotificationBus;
use stockhub_realtime::connection::registry::ConnectionRegistry;
use stockhub_realtime::message::envelope::FanoutEnvelope;
use stockhub_realtime::message::types::StreamEvent;

use super::store::NotificationStore;

/// Coordinates notification sends: persist first, then fan out.
pub struct DeliveryService {
    /// Durable notification record.
    store: Arc<dyn NotificationStore>,
    /// Cross-process bus publisher.
    bus: Arc<dyn NotificationBus>,
    /// Local connection registry.
    registry: Arc<ConnectionRegistry>,
    /// This process's instance id, stamped on published envelopes.
    origin: Uuid,
    /// Default expiry applied when content has none.
    default_expiry: Option<Duration>,
}

impl std::fmt::Debug for DeliveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryService")
            .field("origin", &self.origin)
            .finish()
    }
}

impl DeliveryService {
    /// Create a new delivery coordinator.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        bus: Arc<dyn NotificationBus>,
        registry: Arc<ConnectionRegistry>,
        origin: Uuid,
        default_expiry: Option<Duration>,
    ) -> Self {
        Self {
            store,
            bus,
            registry,
            origin,
            default_expiry,
        }
    }

    /// Send a tenant-wide broadcast.
    ///
    /// Returns the persisted notification regardless of push outcome.
    pub async fn send_broadcast(
        &self,
        tenant_id: TenantId,
        content: NewNotification,
    ) -> AppResult<Notification> {
        let notification =
            content.materialize(tenant_id, None, None, Utc::now(), self.default_expiry)?;

        self.store.insert(&notification).await?;
        self.fan_out(&notification).await;

        Ok(notification)
    }

    /// Send one independent notification per target user.
    pub async fn send_to_users(
        &self,
        tenant_id: TenantId,
        user_ids: &[UserId],
        content: NewNotification,
    ) -> AppResult<Vec<Notification>> {
        self.send_to_users_with_role(tenant_id, user_ids, None, content)
            .await
    }

    /// Send to every member of a role.
    ///
    /// Role → user resolution is the caller's job; this only stamps the
    /// role code on the rows for traceability.
    pub async fn send_to_role(
        &self,
        tenant_id: TenantId,
        role_code: &str,
        resolved_user_ids: &[UserId],
        content: NewNotification,
    ) -> AppResult<Vec<Notification>> {
        self.send_to_users_with_role(
            tenant_id,
            resolved_user_ids,
            Some(role_code.to_string()),
            content,
        )
        .await
    }

    async fn send_to_users_with_role(
        &self,
        tenant_id: TenantId,
        user_ids: &[UserId],
        role_code: Option<String>,
        content: NewNotification,
    ) -> AppResult<Vec<Notification>> {
        let targets = dedupe(user_ids);
        if targets.is_empty() {
            return Err(AppError::validation("At least one target user is required"));
        }

        let now = Utc::now();
        let notifications = targets
            .into_iter()
            .map(|user_id| {
                content.materialize(
                    tenant_id,
                    Some(user_id),
                    role_code.clone(),
                    now,
                    self.default_expiry,
                )
            })
            .collect::<AppResult<Vec<_>>>()?;

        self.store.insert_many(&notifications).await?;

        for notification in &notifications {
            self.fan_out(notification).await;
        }

        Ok(notifications)
    }

    /// Publish to the bus and push to local connections.
    ///
    /// Both halves are best-effort. The local push does not wait for the
    /// bus round-trip; the subscriber skips this process's own envelopes
    /// so nothing is delivered twice.
    async fn fan_out(&self, notification: &Notification) {
        let envelope = FanoutEnvelope::new(self.origin, notification.clone());
        if let Err(e) = self.bus.publish(&envelope).await {
            warn!(
                error = %e,
                id = %notification.id,
                "Bus publish failed; cross-process realtime delivery degraded"
            );
        }

        let event = StreamEvent::message(notification.clone());
        let delivered = match notification.user_id {
            Some(user_id) => {
                self.registry
                    .send_to_user(notification.tenant_id, user_id, &event)
            }
            None => self
                .registry
                .broadcast_to_tenant(notification.tenant_id, &event),
        };

        debug!(
            id = %notification.id,
            delivered,
            broadcast = notification.is_broadcast(),
            "Local push complete"
        );
    }
}

/// Collapse duplicate user ids, preserving first-seen order.
fn dedupe(user_ids: &[UserId]) -> Vec<UserId> {
    let mut seen = HashSet::new();
    user_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::test_support::{FailingBus, FailingStore, MemoryStore, RecordingBus};
    use stockhub_core::config::realtime::RealtimeConfig;
    use stockhub_entity::notification::{NotificationKind, NotificationPriority};
    use stockhub_realtime::metrics::EngineMetrics;

    fn content() -> NewNotification {
        NewNotification {
            kind: NotificationKind::Ticket,
            category: Some("stock".to_string()),
            priority: NotificationPriority::High,
            title: "Low stock".to_string(),
            message: "SKU-100 fell below the reorder point".to_string(),
            payload: None,
            expires_at: None,
        }
    }

    fn registry() -> Arc<ConnectionRegistry> {
        Arc::new(ConnectionRegistry::new(
            RealtimeConfig::default(),
            Arc::new(EngineMetrics::new()),
        ))
    }

    fn service(
        store: Arc<dyn NotificationStore>,
        bus: Arc<dyn NotificationBus>,
        registry: Arc<ConnectionRegistry>,
    ) -> DeliveryService {
        DeliveryService::new(store, bus, registry, Uuid::new_v4(), None)
    }

    #[tokio::test]
    async fn test_one_independent_row_per_user() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), Arc::new(RecordingBus::new()), registry());

        let tenant = TenantId::new();
        let users = [UserId::new(), UserId::new()];
        let sent = svc.send_to_users(tenant, &users, content()).await.unwrap();

        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].id, sent[1].id);
        assert_eq!(store.all().len(), 2);
        assert!(sent.iter().all(|n| n.tenant_id == tenant && !n.is_broadcast()));
    }

    #[tokio::test]
    async fn test_duplicate_targets_collapsed() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), Arc::new(RecordingBus::new()), registry());

        let user = UserId::new();
        let sent = svc
            .send_to_users(TenantId::new(), &[user, user, user], content())
            .await
            .unwrap();

        assert_eq!(sent.len(), 1);
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_target_list_rejected() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingBus::new()),
            registry(),
        );
        assert!(svc
            .send_to_users(TenantId::new(), &[], content())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_broadcast_has_no_user_and_publishes() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(RecordingBus::new());
        let svc = service(store.clone(), bus.clone(), registry());

        let notification = svc
            .send_broadcast(TenantId::new(), content())
            .await
            .unwrap();

        assert!(notification.is_broadcast());
        assert_eq!(store.all().len(), 1);
        assert_eq!(bus.published().len(), 1);
        assert_eq!(bus.published()[0].notification.id, notification.id);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal_and_nothing_published() {
        let bus = Arc::new(RecordingBus::new());
        let svc = service(Arc::new(FailingStore), bus.clone(), registry());

        let result = svc.send_broadcast(TenantId::new(), content()).await;

        assert!(result.is_err());
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_bus_failure_is_degraded_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry();
        let svc = service(store.clone(), Arc::new(FailingBus), registry.clone());

        let tenant = TenantId::new();
        let user = UserId::new();
        let (_handle, mut rx) = registry.register(tenant, user);
        let _ = rx.try_recv();

        // The send still succeeds and the local push still happens.
        let sent = svc.send_to_users(tenant, &[user], content()).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(store.all().len(), 1);
        assert!(matches!(
            rx.try_recv().unwrap(),
            StreamEvent::Message { .. }
        ));
    }

    #[tokio::test]
    async fn test_role_code_stamped_on_rows() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), Arc::new(RecordingBus::new()), registry());

        let sent = svc
            .send_to_role(
                TenantId::new(),
                "warehouse_manager",
                &[UserId::new(), UserId::new()],
                content(),
            )
            .await
            .unwrap();

        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|n| n.role_code.as_deref() == Some("warehouse_manager")));
    }

    #[tokio::test]
    async fn test_local_push_reaches_connected_user_immediately() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry();
        let svc = service(store, Arc::new(RecordingBus::new()), registry.clone());

        let tenant = TenantId::new();
        let user = UserId::new();
        let (_handle, mut rx) = registry.register(tenant, user);
        let _ = rx.try_recv();

        let sent = svc.send_to_users(tenant, &[user], content()).await.unwrap();

        match rx.try_recv().unwrap() {
            StreamEvent::Message { notification } => assert_eq!(notification.id, sent[0].id),
            other => panic!("expected message, got {other:?}"),
        }
    }
}
