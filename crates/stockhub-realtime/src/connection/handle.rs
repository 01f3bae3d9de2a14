//! Individual push stream connection handle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use stockhub_core::types::id::{TenantId, UserId};

use crate::message::types::StreamEvent;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A handle to a single push stream connection.
///
/// Holds the sender half of the per-connection outbound channel plus the
/// identity and liveness state. The registry owns every handle; the
/// transport only ever sees the receiver half.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Tenant this connection belongs to.
    pub tenant_id: TenantId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// Sender for outbound events.
    sender: mpsc::Sender<StreamEvent>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last client liveness signal, as unix milliseconds.
    last_seen: AtomicI64,
    /// Whether the connection is still considered writable.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(tenant_id: TenantId, user_id: UserId, sender: mpsc::Sender<StreamEvent>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            sender,
            connected_at: now,
            last_seen: AtomicI64::new(now.timestamp_millis()),
            alive: AtomicBool::new(true),
        }
    }

    /// Write an event to this connection.
    ///
    /// Never blocks: a full buffer drops the event for this connection
    /// only, and a closed channel marks the connection dead so the next
    /// sweep removes it.
    pub fn send(&self, event: StreamEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Connection send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check whether the connection is still considered writable.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead. Removal happens on the next sweep.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a client liveness signal.
    ///
    /// Only inbound signals extend liveness; outgoing heartbeats never
    /// touch this clock.
    pub fn touch(&self) {
        self.last_seen
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// The last recorded client liveness signal.
    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.last_seen.load(Ordering::Relaxed))
            .unwrap_or(self.connected_at)
    }
}
