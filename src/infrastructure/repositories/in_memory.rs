use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    errors::StoreError,
    models::{MarkSentOutcome, MessageStatus, NewScheduledMessage, ScheduledMessage},
    repositories::MessageRepository,
};

#[derive(Default)]
struct State {
    messages: HashMap<Uuid, ScheduledMessage>,
    // (status = pending, scheduled_at) index; sent messages leave it.
    pending: BTreeSet<(DateTime<Utc>, Uuid)>,
}

/// Process-local store. Nothing survives a restart, so the binary only falls
/// back to it when no database is configured.
#[derive(Default, Clone)]
pub struct InMemoryMessageRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: NewScheduledMessage) -> Result<ScheduledMessage, StoreError> {
        let now = Utc::now();
        let entry = ScheduledMessage {
            id: Uuid::new_v4(),
            channel: message.channel,
            destination: message.destination,
            content: message.content,
            scheduled_at: message.scheduled_at,
            status: MessageStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.pending.insert((entry.scheduled_at, entry.id));
        state.messages.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state.messages.get(&id).cloned())
    }

    async fn query_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .pending
            .range(..=(now, Uuid::from_u128(u128::MAX)))
            .filter_map(|(_, id)| state.messages.get(id))
            .filter(|message| message.is_due(now))
            .cloned()
            .collect())
    }

    async fn mark_sent(&self, id: Uuid) -> Result<MarkSentOutcome, StoreError> {
        let mut state = self.state.write().await;
        let entry = state.messages.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if entry.status == MessageStatus::Sent {
            return Ok(MarkSentOutcome::AlreadySent);
        }

        entry.status = MessageStatus::Sent;
        entry.updated_at = Utc::now();
        let key = (entry.scheduled_at, entry.id);
        state.pending.remove(&key);
        Ok(MarkSentOutcome::Transitioned)
    }

    async fn record_failure(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let entry = state.messages.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if entry.status == MessageStatus::Pending {
            entry.attempts += 1;
            entry.last_error = Some(reason.to_string());
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::models::ChannelKind;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()
    }

    fn new_message(scheduled_at: DateTime<Utc>) -> NewScheduledMessage {
        NewScheduledMessage {
            channel: ChannelKind::Email,
            destination: "user@example.com".to_string(),
            content: "hello".to_string(),
            scheduled_at,
        }
    }

    #[tokio::test]
    async fn create_stores_pending_message_with_unique_id() {
        let repo = InMemoryMessageRepository::new();

        let first = repo.create(new_message(base())).await.unwrap();
        let second = repo.create(new_message(base())).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, MessageStatus::Pending);
        assert_eq!(first.attempts, 0);
        assert_eq!(repo.get(first.id).await.unwrap(), Some(first));
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn query_due_returns_exactly_pending_messages_at_or_before_now() {
        let repo = InMemoryMessageRepository::new();
        let early = repo.create(new_message(base() - Duration::minutes(5))).await.unwrap();
        let on_time = repo.create(new_message(base())).await.unwrap();
        let late = repo.create(new_message(base() + Duration::seconds(1))).await.unwrap();
        let sent = repo.create(new_message(base() - Duration::hours(1))).await.unwrap();
        repo.mark_sent(sent.id).await.unwrap();

        let due: Vec<Uuid> = repo
            .query_due(base())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(due, vec![early.id, on_time.id]);
        assert!(!due.contains(&late.id));
        assert!(!due.contains(&sent.id));
    }

    #[tokio::test]
    async fn sent_messages_are_never_due_again() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.create(new_message(base())).await.unwrap();
        repo.mark_sent(message.id).await.unwrap();

        let far_future = base() + Duration::days(365);
        assert!(repo.query_due(far_future).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_sent_is_idempotent() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.create(new_message(base())).await.unwrap();

        assert_eq!(
            repo.mark_sent(message.id).await.unwrap(),
            MarkSentOutcome::Transitioned
        );
        assert_eq!(
            repo.mark_sent(message.id).await.unwrap(),
            MarkSentOutcome::AlreadySent
        );
        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn mark_sent_unknown_id_is_not_found() {
        let repo = InMemoryMessageRepository::new();
        let id = Uuid::new_v4();

        let err = repo.mark_sent(id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn record_failure_keeps_message_pending() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.create(new_message(base())).await.unwrap();

        repo.record_failure(message.id, "provider said no").await.unwrap();
        repo.record_failure(message.id, "still no").await.unwrap();

        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.last_error.as_deref(), Some("still no"));
        assert_eq!(repo.query_due(base()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn record_failure_after_sent_is_ignored() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.create(new_message(base())).await.unwrap();
        repo.mark_sent(message.id).await.unwrap();

        repo.record_failure(message.id, "late failure").await.unwrap();

        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn concurrent_mark_sent_has_a_single_winner() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.create(new_message(base())).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.mark_sent(message.id).await.unwrap() })
            })
            .collect();

        let mut transitioned = 0;
        for handle in handles {
            if handle.await.unwrap() == MarkSentOutcome::Transitioned {
                transitioned += 1;
            }
        }
        assert_eq!(transitioned, 1);
    }
}
