use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    errors::StoreError,
    models::{MarkSentOutcome, NewScheduledMessage, ScheduledMessage},
};

/// Durable home of scheduled messages. Intake and the dispatcher coordinate
/// only through this trait; `mark_sent` is the one concurrency primitive they
/// rely on.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persists a new message with status `Pending` and a freshly generated id.
    async fn create(&self, message: NewScheduledMessage) -> Result<ScheduledMessage, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledMessage>, StoreError>;

    /// Every `Pending` message with `scheduled_at <= now`, oldest first.
    /// Implementations must serve this from a `(status, scheduled_at)` index.
    async fn query_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledMessage>, StoreError>;

    /// Conditional `Pending -> Sent`. Calling it on a message that is already
    /// sent succeeds with [`MarkSentOutcome::AlreadySent`].
    async fn mark_sent(&self, id: Uuid) -> Result<MarkSentOutcome, StoreError>;

    /// Bumps the attempt counter and stores the rejection reason. Leaves the
    /// status untouched and does nothing once the message is sent.
    async fn record_failure(&self, id: Uuid, reason: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
