//! Request DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhub_core::types::id::UserId;
use stockhub_entity::notification::{NewNotification, NotificationFilter, NotificationKind};

/// Body of `POST /api/notifications/broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendBroadcastRequest {
    /// Notification content.
    pub content: NewNotification,
}

/// Body of `POST /api/notifications/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendToUsersRequest {
    /// Target users. Duplicates are collapsed.
    pub user_ids: Vec<UserId>,
    /// Notification content.
    pub content: NewNotification,
}

/// Body of `POST /api/notifications/send-role`.
///
/// Role membership is resolved by the caller; `user_ids` carries the
/// resolution result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendToRoleRequest {
    /// The role the notification addresses.
    pub role_code: String,
    /// Users resolved from the role.
    pub user_ids: Vec<UserId>,
    /// Notification content.
    pub content: NewNotification,
}

/// Filter query parameters for `GET /api/notifications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFilterParams {
    /// Only return unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Restrict to a single kind.
    #[serde(default)]
    pub kind: Option<NotificationKind>,
    /// Only notifications created at or after this instant.
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    /// Only notifications created at or before this instant.
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
}

impl NotificationFilterParams {
    /// Converts to the entity-level filter.
    pub fn into_filter(self) -> NotificationFilter {
        NotificationFilter {
            unread_only: self.unread_only,
            kind: self.kind,
            created_after: self.created_after,
            created_before: self.created_before,
        }
    }
}
