use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::ChannelKind;

/// Intake rejections. These are client mistakes: surfaced verbatim to the
/// caller and never treated as service anomalies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {channel} destination: {destination:?}")]
    InvalidDestination {
        channel: ChannelKind,
        destination: String,
    },
    #[error("Message content cannot be empty.")]
    EmptyContent,
    #[error("Message exceeds the {limit} character limit ({actual} characters).")]
    ContentTooLong { limit: usize, actual: usize },
    #[error("Invalid date and time format. Use ISO 8601 (e.g. YYYY-MM-DDTHH:MM:SS+00:00).")]
    InvalidTimeFormat,
    #[error("Send date must be in the future, no earlier than {}.", .earliest.to_rfc3339())]
    TimeNotInFuture { earliest: DateTime<Utc> },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Message store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    #[error("Message not found: {0}")]
    NotFound(Uuid),
    #[error("Corrupt message record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        StoreError::Unavailable(err.into())
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Message not found: {0}")]
    NotFound(Uuid),
}
