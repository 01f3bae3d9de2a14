//! # stockhub-realtime
//!
//! Real-time notification delivery engine for StockHub. Provides:
//!
//! - Connection registry: tenant → user → live push streams, safe under
//!   concurrent register/remove/send
//! - Liveness sweep with heartbeat emission and dead-connection eviction
//! - Cross-process fan-out via a Redis pub/sub bridge (in-memory bridge
//!   for single-node deployments)
//! - Fan-out envelope with forward-compatible versioning

pub mod bridge;
pub mod connection;
pub mod message;
pub mod metrics;
pub mod server;

pub use bridge::{BusRouter, NotificationBus};
pub use connection::registry::ConnectionRegistry;
pub use message::envelope::FanoutEnvelope;
pub use message::types::StreamEvent;
pub use server::RealtimeEngine;
