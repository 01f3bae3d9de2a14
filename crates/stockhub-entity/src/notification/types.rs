//! Notification kind and priority enumerations.

use serde::{Deserialize, Serialize};

/// Kind of a notification. Closed set; collaborators cannot extend it
/// without a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// System-generated notifications (maintenance, tenant-level events).
    System,
    /// Direct user-to-user messages.
    DirectMessage,
    /// Mentions of a user in shared content.
    Mention,
    /// Support/ops ticket updates.
    Ticket,
    /// Workflow state transitions.
    Workflow,
}

impl NotificationKind {
    /// Return the kind as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::DirectMessage => "direct_message",
            Self::Mention => "mention",
            Self::Ticket => "ticket",
            Self::Workflow => "workflow",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "system" => Ok(Self::System),
            "direct_message" => Ok(Self::DirectMessage),
            "mention" => Ok(Self::Mention),
            "ticket" => Ok(Self::Ticket),
            "workflow" => Ok(Self::Workflow),
            other => Err(format!("unknown notification kind: '{other}'")),
        }
    }
}

/// Delivery priority of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Informational, no urgency.
    Low,
    /// Default priority.
    Normal,
    /// Needs attention soon.
    High,
    /// Needs immediate attention.
    Urgent,
}

impl NotificationPriority {
    /// Return the priority as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl Default for NotificationPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for NotificationPriority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown notification priority: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_string_roundtrip() {
        for kind in [
            NotificationKind::System,
            NotificationKind::DirectMessage,
            NotificationKind::Mention,
            NotificationKind::Ticket,
            NotificationKind::Workflow,
        ] {
            let parsed = NotificationKind::try_from(kind.as_str().to_string()).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(NotificationKind::try_from("carrier_pigeon".to_string()).is_err());
    }
}
