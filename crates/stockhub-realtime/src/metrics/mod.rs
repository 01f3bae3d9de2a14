//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total connections ever registered.
    pub connections_opened: AtomicU64,
    /// Total connections removed.
    pub connections_closed: AtomicU64,
    /// Total events written to connections.
    pub events_sent: AtomicU64,
    /// Total events dropped (full buffer or dead connection).
    pub events_dropped: AtomicU64,
    /// Total envelopes published to the bus.
    pub envelopes_published: AtomicU64,
    /// Total envelopes received from the bus.
    pub envelopes_received: AtomicU64,
    /// Total connections evicted by the sweep.
    pub sweep_evictions: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registered connection.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a removed connection.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record successfully written events.
    pub fn events_sent(&self, count: u64) {
        self.events_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a dropped event.
    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a published envelope.
    pub fn envelope_published(&self) {
        self.envelopes_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a received envelope.
    pub fn envelope_received(&self) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sweep eviction.
    pub fn sweep_eviction(&self) {
        self.sweep_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            envelopes_published: self.envelopes_published.load(Ordering::Relaxed),
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            sweep_evictions: self.sweep_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever registered.
    pub connections_opened: u64,
    /// Total connections removed.
    pub connections_closed: u64,
    /// Total events written to connections.
    pub events_sent: u64,
    /// Total events dropped.
    pub events_dropped: u64,
    /// Total envelopes published to the bus.
    pub envelopes_published: u64,
    /// Total envelopes received from the bus.
    pub envelopes_received: u64,
    /// Total sweep evictions.
    pub sweep_evictions: u64,
}
