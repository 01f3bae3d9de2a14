//! Cross-process fan-out envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use stockhub_core::result::AppResult;
use stockhub_entity::Notification;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// The message carried on the bus.
///
/// Wraps a notification with a format version tag (so processes running
/// different code versions can decode each other's envelopes), the
/// publishing process's instance id (so a subscriber can skip envelopes
/// it published itself; the coordinator already pushed those locally),
/// and the send timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutEnvelope {
    /// Envelope format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Instance id of the publishing process.
    pub origin: Uuid,
    /// When the envelope was published.
    pub sent_at: DateTime<Utc>,
    /// The notification being fanned out.
    pub notification: Notification,
}

impl FanoutEnvelope {
    /// Wrap a notification for publication from the given process.
    pub fn new(origin: Uuid, notification: Notification) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            origin,
            sent_at: Utc::now(),
            notification,
        }
    }

    /// Serialize for the wire.
    pub fn encode(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the wire.
    ///
    /// Unknown fields are ignored and a newer version tag alone does not
    /// reject an envelope, so older processes keep decoding envelopes
    /// from newer ones as long as the fields they need are present.
    pub fn decode(raw: &str) -> AppResult<Self> {
        let envelope: Self = serde_json::from_str(raw)?;
        if envelope.version != ENVELOPE_VERSION {
            debug!(
                version = envelope.version,
                supported = ENVELOPE_VERSION,
                "Decoded envelope with a different format version"
            );
        }
        Ok(envelope)
    }
}

fn default_version() -> u32 {
    ENVELOPE_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhub_core::types::id::{TenantId, UserId};
    use stockhub_entity::notification::{NewNotification, NotificationKind, NotificationPriority};

    fn notification() -> Notification {
        NewNotification {
            kind: NotificationKind::Mention,
            category: None,
            priority: NotificationPriority::Normal,
            title: "Mentioned in a count sheet".to_string(),
            message: "See aisle 4 recount".to_string(),
            payload: None,
            expires_at: None,
        }
        .materialize(TenantId::new(), Some(UserId::new()), None, Utc::now(), None)
        .unwrap()
    }

    #[test]
    fn test_encode_decode() {
        let origin = Uuid::new_v4();
        let envelope = FanoutEnvelope::new(origin, notification());
        let decoded = FanoutEnvelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded.origin, origin);
        assert_eq!(decoded.notification.id, envelope.notification.id);
    }

    #[test]
    fn test_newer_version_with_extra_fields_still_decodes() {
        let envelope = FanoutEnvelope::new(Uuid::new_v4(), notification());
        let mut value = serde_json::to_value(&envelope).unwrap();
        value["version"] = serde_json::json!(99);
        value["routing_hint"] = serde_json::json!("fast-lane");

        let decoded = FanoutEnvelope::decode(&value.to_string()).unwrap();
        assert_eq!(decoded.version, 99);
        assert_eq!(decoded.notification.id, envelope.notification.id);
    }

    #[test]
    fn test_garbage_payload_rejected() {
        assert!(FanoutEnvelope::decode("not json at all").is_err());
    }
}
