use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::channel::ChannelKind;

/// Status lifecycle of a scheduled message. The only transition is
/// `Pending -> Sent`; `Sent` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MessageStatus::Pending),
            "sent" => Some(MessageStatus::Sent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledMessage {
    pub id: Uuid,
    pub channel: ChannelKind,
    pub destination: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: MessageStatus,
    /// Rejected send attempts. Diagnostic only, never consulted for eligibility.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledMessage {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == MessageStatus::Pending && self.scheduled_at <= now
    }
}

/// Validated fields of a message that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduledMessage {
    pub channel: ChannelKind,
    pub destination: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Result of a conditional `mark_sent`. Both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkSentOutcome {
    Transitioned,
    AlreadySent,
}
