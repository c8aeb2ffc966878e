use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, postgres::PgPoolOptions};
use uuid::Uuid;

use crate::domain::{
    errors::StoreError,
    models::{ChannelKind, MarkSentOutcome, MessageStatus, NewScheduledMessage, ScheduledMessage},
    repositories::MessageRepository,
};

pub type PgPool = Pool<Postgres>;

const SELECT_COLUMNS: &str = r#"
    SELECT id, channel, destination, content, scheduled_at, status, attempts, last_error,
           created_at, updated_at
    FROM scheduled_messages
"#;

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Arc<Self>, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StoreError::unavailable)
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create(&self, message: NewScheduledMessage) -> Result<ScheduledMessage, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let record = sqlx::query_as::<_, ScheduledMessageRecord>(
            r#"
            INSERT INTO scheduled_messages (
                id, channel, destination, content, scheduled_at, status, attempts, last_error,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, NULL, $7, $7)
            RETURNING id, channel, destination, content, scheduled_at, status, attempts,
                      last_error, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(message.channel.as_str())
        .bind(&message.destination)
        .bind(&message.content)
        .bind(message.scheduled_at)
        .bind(MessageStatus::Pending.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        record.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledMessage>, StoreError> {
        let record = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        record.map(ScheduledMessage::try_from).transpose()
    }

    async fn query_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledMessage>, StoreError> {
        // Range read on idx_scheduled_messages_status_scheduled_at.
        let rows = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            "{SELECT_COLUMNS} WHERE status = $1 AND scheduled_at <= $2 ORDER BY scheduled_at ASC"
        ))
        .bind(MessageStatus::Pending.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        rows.into_iter().map(ScheduledMessage::try_from).collect()
    }

    async fn mark_sent(&self, id: Uuid) -> Result<MarkSentOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_messages
            SET status = $2,
                updated_at = $4
            WHERE id = $1
              AND status = $3
            "#,
        )
        .bind(id)
        .bind(MessageStatus::Sent.as_str())
        .bind(MessageStatus::Pending.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        if result.rows_affected() == 1 {
            return Ok(MarkSentOutcome::Transitioned);
        }

        // Nothing matched: either someone else already sent it, or it does not exist.
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM scheduled_messages WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::unavailable)?;

        match status.as_deref().map(MessageStatus::from_str) {
            None => Err(StoreError::NotFound(id)),
            Some(Some(MessageStatus::Sent)) => Ok(MarkSentOutcome::AlreadySent),
            Some(_) => Err(StoreError::Corrupt(format!(
                "message {id} has status {status:?} after conditional update"
            ))),
        }
    }

    async fn record_failure(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_messages
            SET attempts = attempts + 1,
                last_error = $2,
                updated_at = $3
            WHERE id = $1
              AND status = $4
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(Utc::now())
        .bind(MessageStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        if result.rows_affected() == 0 && self.get(id).await?.is_none() {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(())
    }
}

#[derive(FromRow)]
struct ScheduledMessageRecord {
    id: Uuid,
    channel: String,
    destination: String,
    content: String,
    scheduled_at: DateTime<Utc>,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScheduledMessageRecord> for ScheduledMessage {
    type Error = StoreError;

    fn try_from(value: ScheduledMessageRecord) -> Result<Self, Self::Error> {
        let channel = ChannelKind::from_str(&value.channel)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown channel {}", value.channel)))?;
        let status = MessageStatus::from_str(&value.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status {}", value.status)))?;

        Ok(Self {
            id: value.id,
            channel,
            destination: value.destination,
            content: value.content,
            scheduled_at: value.scheduled_at,
            status,
            attempts: value.attempts.max(0) as u32,
            last_error: value.last_error,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
