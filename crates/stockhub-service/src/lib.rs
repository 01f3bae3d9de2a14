//! # stockhub-service
//!
//! Service layer for StockHub's notification delivery subsystem: the
//! delivery coordinator (persist, then fan out), the thin query layer
//! over the notification store, and the request context.

pub mod context;
pub mod notification;

pub use context::RequestContext;
pub use notification::delivery::DeliveryService;
pub use notification::query::NotificationQueryService;
pub use notification::store::NotificationStore;
