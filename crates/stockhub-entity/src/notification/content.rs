//! Notification content value object.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockhub_core::error::AppError;
use stockhub_core::result::AppResult;
use stockhub_core::types::id::{NotificationId, TenantId, UserId};

use super::model::Notification;
use super::types::{NotificationKind, NotificationPriority};

/// The content a collaborator submits when sending a notification.
///
/// Addressing (tenant, user, role) is supplied separately by the
/// delivery coordinator; this carries only what ends up identical on
/// every materialized row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// Notification kind.
    pub kind: NotificationKind,
    /// Optional finer-grained category.
    #[serde(default)]
    pub category: Option<String>,
    /// Delivery priority.
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Short title. Must be non-empty.
    pub title: String,
    /// Free-text body.
    pub message: String,
    /// Opaque structured payload (JSON object).
    #[serde(default)]
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
    /// Explicit expiry. Must lie in the future when given; when absent
    /// the configured default expiry applies.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewNotification {
    /// Validate the content against the given creation instant.
    pub fn validate(&self, now: DateTime<Utc>) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Notification title must not be empty"));
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at <= now {
                return Err(AppError::validation(
                    "Notification expiry must be in the future",
                ));
            }
        }
        Ok(())
    }

    /// Materialize one notification row for the given target.
    ///
    /// `user` of `None` produces a tenant-wide broadcast row. The
    /// explicit expiry wins over `default_expiry`; either way the
    /// resulting `expires_at` is strictly after `created_at`.
    pub fn materialize(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
        role_code: Option<String>,
        now: DateTime<Utc>,
        default_expiry: Option<Duration>,
    ) -> AppResult<Notification> {
        self.validate(now)?;

        let expires_at = self.expires_at.or_else(|| default_expiry.map(|d| now + d));

        Ok(Notification {
            id: NotificationId::new(),
            tenant_id,
            user_id,
            role_code,
            kind: self.kind,
            category: self.category.clone(),
            priority: self.priority,
            title: self.title.clone(),
            message: self.message.clone(),
            payload: self.payload.clone().map(serde_json::Value::Object),
            is_read: false,
            read_at: None,
            created_at: now,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> NewNotification {
        NewNotification {
            kind: NotificationKind::Ticket,
            category: Some("stock".to_string()),
            priority: NotificationPriority::High,
            title: "Low stock".to_string(),
            message: "SKU-100 fell below the reorder point".to_string(),
            payload: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut c = content();
        c.title = "   ".to_string();
        assert!(c.validate(Utc::now()).is_err());
    }

    #[test]
    fn test_past_expiry_rejected() {
        let now = Utc::now();
        let mut c = content();
        c.expires_at = Some(now - Duration::minutes(1));
        assert!(c.materialize(TenantId::new(), None, None, now, None).is_err());
    }

    #[test]
    fn test_default_expiry_applied() {
        let now = Utc::now();
        let n = content()
            .materialize(TenantId::new(), None, None, now, Some(Duration::days(30)))
            .unwrap();
        assert_eq!(n.expires_at, Some(now + Duration::days(30)));
        assert!(n.expires_at.unwrap() > n.created_at);
    }

    #[test]
    fn test_explicit_expiry_wins() {
        let now = Utc::now();
        let explicit = now + Duration::hours(2);
        let mut c = content();
        c.expires_at = Some(explicit);
        let n = c
            .materialize(TenantId::new(), None, None, now, Some(Duration::days(30)))
            .unwrap();
        assert_eq!(n.expires_at, Some(explicit));
    }

    #[test]
    fn test_fresh_row_is_unread() {
        let n = content()
            .materialize(TenantId::new(), Some(UserId::new()), None, Utc::now(), None)
            .unwrap();
        assert!(n.is_unread());
        assert!(n.read_at.is_none());
    }
}
