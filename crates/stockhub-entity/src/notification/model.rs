//! Notification entity model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockhub_core::types::id::{NotificationId, TenantId, UserId};

use super::types::{NotificationKind, NotificationPriority};

/// A notification: the durable unit of delivery.
///
/// Created once at send time, mutated only by mark-read (idempotent)
/// and removed by expiry cleanup. A row without a `user_id` is a
/// tenant-wide broadcast visible to every user of the tenant; broadcast
/// rows carry no per-recipient read tracking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Owning tenant. All visibility and fan-out is scoped to it.
    pub tenant_id: TenantId,
    /// Target user. `None` means tenant-wide broadcast.
    pub user_id: Option<UserId>,
    /// Target role code, informational only. Role membership is resolved
    /// by the caller before the send.
    pub role_code: Option<String>,
    /// Notification kind.
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    /// Optional finer-grained category within the kind.
    pub category: Option<String>,
    /// Delivery priority.
    #[sqlx(try_from = "String")]
    pub priority: NotificationPriority,
    /// Short title.
    pub title: String,
    /// Free-text body.
    pub message: String,
    /// Opaque structured payload (JSON object). Not interpreted here.
    pub payload: Option<serde_json::Value>,
    /// Whether the notification has been read.
    pub is_read: bool,
    /// When the notification was first read. Set exactly once, together
    /// with `is_read`.
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created. Immutable.
    pub created_at: DateTime<Utc>,
    /// Optional expiry; always strictly after `created_at`.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Whether this notification is still unread.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Whether this notification is a tenant-wide broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether this notification has expired at the given instant.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= at).unwrap_or(false)
    }
}

/// Aggregate unread counts for one user of one tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnreadCounts {
    /// Total unread, non-expired notifications.
    pub total: i64,
    /// Unread counts grouped by kind.
    pub by_kind: BTreeMap<String, i64>,
    /// Unread notifications with high priority.
    pub high_priority: i64,
    /// Unread notifications with urgent priority.
    pub urgent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Notification {
        Notification {
            id: NotificationId::new(),
            tenant_id: TenantId::new(),
            user_id: Some(UserId::new()),
            role_code: None,
            kind: NotificationKind::System,
            category: None,
            priority: NotificationPriority::Normal,
            title: "Low stock".to_string(),
            message: "SKU-100 fell below the reorder point".to_string(),
            payload: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn test_unexpired_without_expiry() {
        let n = sample();
        assert!(!n.is_expired_at(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_expired_at_threshold() {
        let mut n = sample();
        n.expires_at = Some(n.created_at + Duration::hours(1));
        assert!(!n.is_expired_at(n.created_at));
        assert!(n.is_expired_at(n.created_at + Duration::hours(1)));
        assert!(n.is_expired_at(n.created_at + Duration::hours(2)));
    }

    #[test]
    fn test_broadcast_addressing() {
        let mut n = sample();
        assert!(!n.is_broadcast());
        n.user_id = None;
        assert!(n.is_broadcast());
    }
}
