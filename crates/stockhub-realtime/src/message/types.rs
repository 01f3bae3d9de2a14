//! Push stream event type definitions.
//!
//! Each event maps onto one frame of the server push stream: the event
//! name plus a JSON data payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use stockhub_entity::Notification;

use crate::connection::handle::ConnectionId;

/// Events written to a client push stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Sent once, immediately after registration, before anything else.
    Connected {
        /// Human-readable confirmation.
        message: String,
        /// The connection's id; clients address liveness pings with it.
        connection_id: ConnectionId,
        /// When the stream was established.
        timestamp: DateTime<Utc>,
    },
    /// Sent on the sweep cadence to keep intermediaries from closing the
    /// stream.
    Heartbeat {
        /// Server time of the heartbeat.
        timestamp: DateTime<Utc>,
    },
    /// A notification delivery.
    Message {
        /// The full notification.
        notification: Notification,
    },
}

impl StreamEvent {
    /// The initial acknowledgement for a freshly registered connection.
    pub fn connected(connection_id: ConnectionId) -> Self {
        Self::Connected {
            message: "stream established".to_string(),
            connection_id,
            timestamp: Utc::now(),
        }
    }

    /// A heartbeat stamped with the sweep's clock.
    pub fn heartbeat(at: DateTime<Utc>) -> Self {
        Self::Heartbeat { timestamp: at }
    }

    /// A notification delivery event.
    pub fn message(notification: Notification) -> Self {
        Self::Message { notification }
    }

    /// The wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Message { .. } => "message",
        }
    }

    /// The wire data payload.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Connected {
                message,
                connection_id,
                timestamp,
            } => json!({
                "message": message,
                "connection_id": connection_id,
                "timestamp": timestamp,
            }),
            Self::Heartbeat { timestamp } => json!({ "timestamp": timestamp }),
            Self::Message { notification } => {
                serde_json::to_value(notification).unwrap_or_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhub_core::types::id::TenantId;
    use stockhub_entity::notification::{NewNotification, NotificationKind, NotificationPriority};
    use uuid::Uuid;

    #[test]
    fn test_event_names_match_wire_framing() {
        let connected = StreamEvent::connected(Uuid::new_v4());
        let heartbeat = StreamEvent::heartbeat(Utc::now());
        assert_eq!(connected.event_name(), "connected");
        assert_eq!(heartbeat.event_name(), "heartbeat");
    }

    #[test]
    fn test_message_payload_is_full_notification() {
        let content = NewNotification {
            kind: NotificationKind::Workflow,
            category: None,
            priority: NotificationPriority::Urgent,
            title: "Approval required".to_string(),
            message: "Purchase order waiting".to_string(),
            payload: None,
            expires_at: None,
        };
        let notification = content
            .materialize(TenantId::new(), None, None, Utc::now(), None)
            .unwrap();
        let event = StreamEvent::message(notification.clone());

        assert_eq!(event.event_name(), "message");
        let payload = event.payload();
        assert_eq!(payload["id"], json!(notification.id));
        assert_eq!(payload["kind"], json!("workflow"));
        assert_eq!(payload["priority"], json!("urgent"));
    }

    #[test]
    fn test_connected_payload_carries_connection_id() {
        let id = Uuid::new_v4();
        let payload = StreamEvent::connected(id).payload();
        assert_eq!(payload["connection_id"], json!(id));
        assert!(payload["timestamp"].is_string());
    }
}
