//! Query filters for notification listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::NotificationKind;

/// Optional filters applied when listing notifications for a user.
///
/// All filters compose with the base visibility predicate (own rows plus
/// tenant broadcasts, excluding expired rows).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFilter {
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
