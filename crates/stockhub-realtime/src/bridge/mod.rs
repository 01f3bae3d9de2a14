//! Bus bridge: cross-process fan-out over a shared pub/sub transport.

pub mod memory_pubsub;
pub mod redis_pubsub;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};
use uuid::Uuid;

use stockhub_core::result::AppResult;

use crate::connection::registry::ConnectionRegistry;
use crate::message::envelope::FanoutEnvelope;
use crate::message::types::StreamEvent;
use crate::metrics::EngineMetrics;

pub use memory_pubsub::MemoryBus;
pub use redis_pubsub::RedisBus;

/// Publishing side of the bus bridge.
///
/// Publish failures are delivery-degraded warnings, never data loss:
/// the store write has already succeeded by the time anything is
/// published, so recipients on other processes still see the
/// notification on their next list/poll.
#[async_trait]
pub trait NotificationBus: Send + Sync + 'static {
    /// Publish an envelope on the well-known channel.
    async fn publish(&self, envelope: &FanoutEnvelope) -> AppResult<()>;
}

/// Subscriber-side handler: resolves an envelope's target and forwards
/// it to the local connection registry.
#[derive(Debug)]
pub struct BusRouter {
    /// Local connection registry.
    registry: Arc<ConnectionRegistry>,
    /// This process's instance id.
    origin: Uuid,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
}

impl BusRouter {
    /// Create a router for this process.
    pub fn new(registry: Arc<ConnectionRegistry>, origin: Uuid, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            registry,
            origin,
            metrics,
        }
    }

    /// This process's instance id.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Route one received envelope to local connections.
    ///
    /// Envelopes published by this process are skipped: the delivery
    /// coordinator already pushed them to the local registry, and
    /// routing them again would deliver twice. Returns the number of
    /// local connections written.
    pub fn route(&self, envelope: FanoutEnvelope) -> usize {
        self.metrics.envelope_received();

        if envelope.origin == self.origin {
            trace!(id = %envelope.notification.id, "Skipping own envelope");
            return 0;
        }

        let notification = envelope.notification;
        let tenant_id = notification.tenant_id;
        let user_id = notification.user_id;
        let event = StreamEvent::message(notification);

        let delivered = match user_id {
            Some(user_id) => self.registry.send_to_user(tenant_id, user_id, &event),
            None => self.registry.broadcast_to_tenant(tenant_id, &event),
        };

        debug!(
            tenant_id = %tenant_id,
            delivered,
            broadcast = user_id.is_none(),
            "Routed bus envelope"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockhub_core::config::realtime::RealtimeConfig;
    use stockhub_core::types::id::{TenantId, UserId};
    use stockhub_entity::notification::{NewNotification, NotificationKind, NotificationPriority};
    use stockhub_entity::Notification;

    fn notification(tenant_id: TenantId, user_id: Option<UserId>) -> Notification {
        NewNotification {
            kind: NotificationKind::Ticket,
            category: None,
            priority: NotificationPriority::High,
            title: "Low stock".to_string(),
            message: "SKU-100 fell below the reorder point".to_string(),
            payload: None,
            expires_at: None,
        }
        .materialize(tenant_id, user_id, None, Utc::now(), None)
        .unwrap()
    }

    fn setup() -> (Arc<ConnectionRegistry>, BusRouter) {
        let metrics = Arc::new(EngineMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(
            RealtimeConfig::default(),
            metrics.clone(),
        ));
        let router = BusRouter::new(registry.clone(), Uuid::new_v4(), metrics);
        (registry, router)
    }

    #[tokio::test]
    async fn test_own_origin_envelope_skipped() {
        let (registry, router) = setup();
        let tenant = TenantId::new();
        let user = UserId::new();
        let (_handle, mut rx) = registry.register(tenant, user);
        let _ = rx.try_recv();

        let envelope = FanoutEnvelope::new(router.origin(), notification(tenant, Some(user)));
        assert_eq!(router.route(envelope), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_foreign_envelope_targets_user() {
        let (registry, router) = setup();
        let tenant = TenantId::new();
        let user = UserId::new();
        let other = UserId::new();
        let (_h1, mut rx_target) = registry.register(tenant, user);
        let (_h2, mut rx_other) = registry.register(tenant, other);
        let _ = rx_target.try_recv();
        let _ = rx_other.try_recv();

        let envelope = FanoutEnvelope::new(Uuid::new_v4(), notification(tenant, Some(user)));
        assert_eq!(router.route(envelope), 1);
        assert!(matches!(
            rx_target.try_recv().unwrap(),
            StreamEvent::Message { .. }
        ));
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_foreign_broadcast_envelope_reaches_whole_tenant() {
        let (registry, router) = setup();
        let tenant = TenantId::new();
        let (_h1, mut rx1) = registry.register(tenant, UserId::new());
        let (_h2, mut rx2) = registry.register(tenant, UserId::new());
        let _ = rx1.try_recv();
        let _ = rx2.try_recv();

        let envelope = FanoutEnvelope::new(Uuid::new_v4(), notification(tenant, None));
        assert_eq!(router.route(envelope), 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }
}
