//! In-memory bus for single-process deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use stockhub_core::result::AppResult;

use crate::message::envelope::FanoutEnvelope;

use super::{BusRouter, NotificationBus};

/// Process-local notification bus backed by a broadcast channel.
///
/// Same contract as the Redis bridge: every subscriber sees every
/// published envelope exactly once, in this process only.
#[derive(Debug)]
pub struct MemoryBus {
    /// Broadcast sender carrying envelopes.
    tx: broadcast::Sender<FanoutEnvelope>,
}

impl MemoryBus {
    /// Create a new in-memory bus.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Subscribe to the envelope stream.
    pub fn subscribe(&self) -> broadcast::Receiver<FanoutEnvelope> {
        self.tx.subscribe()
    }

    /// Spawn a subscriber loop forwarding envelopes to the router.
    pub fn spawn_subscriber(
        &self,
        router: Arc<BusRouter>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let mut rx = self.tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(envelope) => {
                            router.route(envelope);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Memory bus subscriber lagged, envelopes dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl NotificationBus for MemoryBus {
    async fn publish(&self, envelope: &FanoutEnvelope) -> AppResult<()> {
        // No subscribers is fine; the envelope just has no audience.
        let _ = self.tx.send(envelope.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use stockhub_core::config::realtime::RealtimeConfig;
    use stockhub_core::types::id::{TenantId, UserId};
    use stockhub_entity::notification::{NewNotification, NotificationKind, NotificationPriority};
    use uuid::Uuid;

    use crate::connection::registry::ConnectionRegistry;
    use crate::message::types::StreamEvent;
    use crate::metrics::EngineMetrics;

    #[tokio::test]
    async fn test_published_envelope_reaches_registered_connection() {
        let metrics = Arc::new(EngineMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(
            RealtimeConfig::default(),
            metrics.clone(),
        ));
        let router = Arc::new(BusRouter::new(registry.clone(), Uuid::new_v4(), metrics));
        let bus = MemoryBus::new(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let subscriber = bus.spawn_subscriber(router, shutdown_rx);

        let tenant = TenantId::new();
        let user = UserId::new();
        let (_handle, mut rx) = registry.register(tenant, user);
        assert!(matches!(
            rx.recv().await.unwrap(),
            StreamEvent::Connected { .. }
        ));

        let notification = NewNotification {
            kind: NotificationKind::DirectMessage,
            category: None,
            priority: NotificationPriority::Normal,
            title: "Ping".to_string(),
            message: "From another process".to_string(),
            payload: None,
            expires_at: None,
        }
        .materialize(tenant, Some(user), None, Utc::now(), None)
        .unwrap();

        // Foreign origin, so the router must deliver it.
        let envelope = FanoutEnvelope::new(Uuid::new_v4(), notification.clone());
        bus.publish(&envelope).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for delivery")
            .unwrap();
        match received {
            StreamEvent::Message { notification: n } => assert_eq!(n.id, notification.id),
            other => panic!("expected message event, got {other:?}"),
        }

        let _ = shutdown_tx.send(true);
        let _ = subscriber.await;
    }
}
