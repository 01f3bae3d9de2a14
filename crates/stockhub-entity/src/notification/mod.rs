//! Notification domain entities.

pub mod content;
pub mod filter;
pub mod model;
pub mod types;

pub use content::NewNotification;
pub use filter::NotificationFilter;
pub use model::{Notification, UnreadCounts};
pub use types::{NotificationKind, NotificationPriority};
