//! Connection registry — the tenant → user → connections index.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use stockhub_core::config::realtime::RealtimeConfig;
use stockhub_core::types::id::{TenantId, UserId};

use crate::message::types::StreamEvent;
use crate::metrics::EngineMetrics;

use super::handle::{ConnectionHandle, ConnectionId};

/// Concurrency-safe index of live push stream connections.
///
/// Two maps: a flat `ConnectionId → handle` map for O(1) lookup and a
/// tenant-rooted `tenant → user → connections` map. Every send starts
/// from the tenant bucket, so cross-tenant delivery cannot happen by
/// construction. All cross-entry iteration (sweep, broadcast) works on
/// snapshots so no shard lock is held while events are written.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Connection ID → handle, for direct lookup and removal.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Tenant → user → connection handles.
    tenants: DashMap<TenantId, HashMap<UserId, Vec<Arc<ConnectionHandle>>>>,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOutcome {
    /// Connections evicted as dead or timed out.
    pub evicted: usize,
    /// Connections that received a heartbeat.
    pub heartbeats: usize,
}

/// Local-process connection statistics.
///
/// Each process tracks only its own connections; aggregating across
/// processes is a separate collector's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Total live connections in this process.
    pub total_connections: usize,
    /// Tenants with at least one live connection.
    pub tenant_count: usize,
    /// Per-tenant breakdown.
    pub per_tenant: Vec<TenantStats>,
}

/// Per-tenant connection statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantStats {
    /// Tenant identifier.
    pub tenant_id: TenantId,
    /// Users with at least one live connection.
    pub user_count: usize,
    /// Total live connections under the tenant.
    pub connection_count: usize,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new(config: RealtimeConfig, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            by_id: DashMap::new(),
            tenants: DashMap::new(),
            metrics,
            config,
        }
    }

    /// Register a new connection for an authenticated identity.
    ///
    /// The `connected` acknowledgement is queued on the handle before the
    /// entry becomes visible to any send path, so it is always the first
    /// event on the stream. Registration never fails: if the receiver is
    /// already gone the ack write is a no-op and the entry is reaped by
    /// the next sweep.
    pub fn register(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(tenant_id, user_id, tx));

        handle.send(StreamEvent::connected(handle.id));

        {
            let mut bucket = self.tenants.entry(tenant_id).or_default();
            let connections = bucket.entry(user_id).or_default();

            if connections.len() >= self.config.max_connections_per_user {
                let oldest = connections.remove(0);
                warn!(
                    conn_id = %oldest.id,
                    user_id = %user_id,
                    max = self.config.max_connections_per_user,
                    "User at max connections, evicting oldest"
                );
                oldest.mark_dead();
                self.by_id.remove(&oldest.id);
            }

            connections.push(handle.clone());
        }
        self.by_id.insert(handle.id, handle.clone());
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            tenant_id = %tenant_id,
            user_id = %user_id,
            "Connection registered"
        );

        (handle, rx)
    }

    /// Remove exactly one connection. Silently idempotent.
    ///
    /// Removing the last connection of a user drops the user bucket, and
    /// removing the last user of a tenant drops the tenant bucket.
    pub fn remove(&self, tenant_id: TenantId, user_id: UserId, conn_id: ConnectionId) {
        let Some((_, handle)) = self.by_id.remove(&conn_id) else {
            return;
        };
        handle.mark_dead();

        if let Some(mut bucket) = self.tenants.get_mut(&tenant_id) {
            if let Some(connections) = bucket.get_mut(&user_id) {
                connections.retain(|c| c.id != conn_id);
                if connections.is_empty() {
                    bucket.remove(&user_id);
                }
            }
            drop(bucket);
            self.tenants.remove_if(&tenant_id, |_, bucket| bucket.is_empty());
        }

        self.metrics.connection_closed();
        info!(conn_id = %conn_id, tenant_id = %tenant_id, user_id = %user_id, "Connection removed");
    }

    /// Write an event to every live connection of one user.
    ///
    /// Returns how many writes succeeded; no connections is `0`, not an
    /// error.
    pub fn send_to_user(&self, tenant_id: TenantId, user_id: UserId, event: &StreamEvent) -> usize {
        let connections = self.user_connections(tenant_id, user_id);
        self.deliver(&connections, event)
    }

    /// Write an event to every live connection of each listed user.
    pub fn send_to_users(
        &self,
        tenant_id: TenantId,
        user_ids: &[UserId],
        event: &StreamEvent,
    ) -> usize {
        user_ids
            .iter()
            .map(|user_id| self.send_to_user(tenant_id, *user_id, event))
            .sum()
    }

    /// Write an event to every connection of every user under a tenant.
    pub fn broadcast_to_tenant(&self, tenant_id: TenantId, event: &StreamEvent) -> usize {
        let connections = self.tenant_connections(tenant_id);
        self.deliver(&connections, event)
    }

    /// Record a client liveness signal for a connection.
    ///
    /// The caller's identity must own the connection; a ping for an
    /// unknown connection or someone else's connection returns `false`.
    pub fn touch(&self, tenant_id: TenantId, user_id: UserId, conn_id: ConnectionId) -> bool {
        match self.by_id.get(&conn_id) {
            Some(handle) if handle.tenant_id == tenant_id && handle.user_id == user_id => {
                handle.touch();
                true
            }
            _ => false,
        }
    }

    /// Evict dead and timed-out connections and heartbeat the rest.
    ///
    /// Operates on a snapshot so no map lock is held while writing.
    /// A connection is evicted when it was marked dead by a failed write
    /// or when `now - last_seen` exceeds `timeout`; otherwise it receives
    /// a heartbeat. Heartbeat sends never extend `last_seen` (only client
    /// signals do), so a half-open stream that never answers eventually
    /// times out.
    pub fn sweep(&self, now: DateTime<Utc>, timeout: Duration) -> SweepOutcome {
        let snapshot: Vec<Arc<ConnectionHandle>> =
            self.by_id.iter().map(|entry| entry.value().clone()).collect();

        let mut outcome = SweepOutcome::default();
        for handle in snapshot {
            let stale = now - handle.last_seen() > timeout;
            if !handle.is_alive() || stale {
                debug!(
                    conn_id = %handle.id,
                    user_id = %handle.user_id,
                    stale,
                    "Sweep evicting connection"
                );
                self.remove(handle.tenant_id, handle.user_id, handle.id);
                self.metrics.sweep_eviction();
                outcome.evicted += 1;
            } else if handle.send(StreamEvent::heartbeat(now)) {
                outcome.heartbeats += 1;
            }
        }
        outcome
    }

    /// Total live connections in this process.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Tenants with at least one live connection in this process.
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Local-process statistics snapshot.
    pub fn stats(&self) -> RegistryStats {
        let per_tenant: Vec<TenantStats> = self
            .tenants
            .iter()
            .map(|entry| TenantStats {
                tenant_id: *entry.key(),
                user_count: entry.value().len(),
                connection_count: entry.value().values().map(Vec::len).sum(),
            })
            .collect();

        RegistryStats {
            total_connections: self.by_id.len(),
            tenant_count: per_tenant.len(),
            per_tenant,
        }
    }

    /// Mark every connection dead and clear the index.
    pub fn close_all(&self) {
        for entry in self.by_id.iter() {
            entry.value().mark_dead();
        }
        let count = self.by_id.len();
        self.by_id.clear();
        self.tenants.clear();
        if count > 0 {
            info!(count, "All connections closed");
        }
    }

    fn user_connections(&self, tenant_id: TenantId, user_id: UserId) -> Vec<Arc<ConnectionHandle>> {
        self.tenants
            .get(&tenant_id)
            .and_then(|bucket| bucket.get(&user_id).cloned())
            .unwrap_or_default()
    }

    fn tenant_connections(&self, tenant_id: TenantId) -> Vec<Arc<ConnectionHandle>> {
        self.tenants
            .get(&tenant_id)
            .map(|bucket| bucket.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    fn deliver(&self, connections: &[Arc<ConnectionHandle>], event: &StreamEvent) -> usize {
        let mut sent = 0;
        for connection in connections {
            if connection.send(event.clone()) {
                sent += 1;
            } else {
                self.metrics.event_dropped();
            }
        }
        self.metrics.events_sent(sent as u64);
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhub_entity::notification::{NewNotification, NotificationKind, NotificationPriority};
    use tokio::sync::mpsc::error::TryRecvError;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(RealtimeConfig::default(), Arc::new(EngineMetrics::new()))
    }

    fn message_event(tenant_id: TenantId, user_id: Option<UserId>) -> StreamEvent {
        let content = NewNotification {
            kind: NotificationKind::System,
            category: None,
            priority: NotificationPriority::Normal,
            title: "Stock alert".to_string(),
            message: "Reorder point reached".to_string(),
            payload: None,
            expires_at: None,
        };
        let notification = content
            .materialize(tenant_id, user_id, None, Utc::now(), None)
            .unwrap();
        StreamEvent::message(notification)
    }

    #[tokio::test]
    async fn test_connected_ack_precedes_everything() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (handle, mut rx) = registry.register(tenant, user);
        registry.send_to_user(tenant, user, &message_event(tenant, Some(user)));

        match rx.try_recv().unwrap() {
            StreamEvent::Connected { connection_id, .. } => assert_eq!(connection_id, handle.id),
            other => panic!("expected connected first, got {other:?}"),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            StreamEvent::Message { .. }
        ));
    }

    #[tokio::test]
    async fn test_tenant_isolation_on_broadcast() {
        let registry = registry();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let user_a = UserId::new();
        let user_b = UserId::new();

        let (_ha, mut rx_a) = registry.register(tenant_a, user_a);
        let (_hb, mut rx_b) = registry.register(tenant_b, user_b);
        let _ = rx_a.try_recv();
        let _ = rx_b.try_recv();

        let delivered = registry.broadcast_to_tenant(tenant_a, &message_event(tenant_a, None));

        assert_eq!(delivered, 1);
        assert!(matches!(
            rx_a.try_recv().unwrap(),
            StreamEvent::Message { .. }
        ));
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multi_device_fan_out() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (_h1, mut rx1) = registry.register(tenant, user);
        let (_h2, mut rx2) = registry.register(tenant, user);
        let _ = rx1.try_recv();
        let _ = rx2.try_recv();

        let delivered = registry.send_to_user(tenant, user, &message_event(tenant, Some(user)));

        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_send_to_absent_user_is_zero_not_error() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();
        assert_eq!(
            registry.send_to_user(tenant, user, &message_event(tenant, Some(user))),
            0
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_prunes_buckets() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (handle, _rx) = registry.register(tenant, user);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.tenant_count(), 1);

        registry.remove(tenant, user, handle.id);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.tenant_count(), 0);

        // Second removal of the same ref is a silent no-op.
        registry.remove(tenant, user, handle.id);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_evicts_timed_out_connection() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (_handle, mut rx) = registry.register(tenant, user);
        let _ = rx.try_recv();

        let later = Utc::now() + Duration::seconds(120);
        let outcome = registry.sweep(later, Duration::seconds(90));

        assert_eq!(outcome.evicted, 1);
        assert_eq!(registry.connection_count(), 0);

        // Evicted connections no longer receive broadcasts.
        let delivered = registry.broadcast_to_tenant(tenant, &message_event(tenant, None));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_sweep_heartbeats_live_connections() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (_handle, mut rx) = registry.register(tenant, user);
        let _ = rx.try_recv();

        let outcome = registry.sweep(Utc::now(), Duration::seconds(90));

        assert_eq!(outcome.evicted, 0);
        assert_eq!(outcome.heartbeats, 1);
        assert!(matches!(
            rx.try_recv().unwrap(),
            StreamEvent::Heartbeat { .. }
        ));
    }

    #[tokio::test]
    async fn test_touch_extends_liveness() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (handle, _rx) = registry.register(tenant, user);

        assert!(registry.touch(tenant, user, handle.id));
        let last_seen = handle.last_seen();
        assert!(Utc::now() - last_seen < Duration::seconds(1));

        // Unknown connection, and someone else's connection, are both rejected.
        assert!(!registry.touch(tenant, user, ConnectionId::new_v4()));
        assert!(!registry.touch(tenant, UserId::new(), handle.id));
    }

    #[tokio::test]
    async fn test_dropped_receiver_marks_dead_and_sweep_reaps() {
        let registry = registry();
        let tenant = TenantId::new();
        let user = UserId::new();

        let (_handle, rx) = registry.register(tenant, user);
        drop(rx);

        // The write fails fast and marks the connection dead.
        assert_eq!(
            registry.send_to_user(tenant, user, &message_event(tenant, Some(user))),
            0
        );
        // Not removed inline; the sweep reaps it.
        assert_eq!(registry.connection_count(), 1);
        let outcome = registry.sweep(Utc::now(), Duration::seconds(90));
        assert_eq!(outcome.evicted, 1);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_oldest_evicted_at_connection_cap() {
        let config = RealtimeConfig {
            max_connections_per_user: 2,
            ..RealtimeConfig::default()
        };
        let registry = ConnectionRegistry::new(config, Arc::new(EngineMetrics::new()));
        let tenant = TenantId::new();
        let user = UserId::new();

        let (h1, _rx1) = registry.register(tenant, user);
        let (_h2, _rx2) = registry.register(tenant, user);
        let (_h3, _rx3) = registry.register(tenant, user);

        assert_eq!(registry.connection_count(), 2);
        assert!(!h1.is_alive());
    }

    #[tokio::test]
    async fn test_stats_reflect_local_connections() {
        let registry = registry();
        let tenant = TenantId::new();
        let user_a = UserId::new();
        let user_b = UserId::new();

        let (_h1, _rx1) = registry.register(tenant, user_a);
        let (_h2, _rx2) = registry.register(tenant, user_a);
        let (_h3, _rx3) = registry.register(tenant, user_b);

        let stats = registry.stats();
        assert_eq!(stats.total_connections, 3);
        assert_eq!(stats.tenant_count, 1);
        assert_eq!(stats.per_tenant[0].user_count, 2);
        assert_eq!(stats.per_tenant[0].connection_count, 3);
    }
}
