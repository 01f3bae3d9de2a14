//! Database repositories.

pub mod notification;

pub use notification::NotificationRepository;
