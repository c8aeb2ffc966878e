use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    application::services::clock::Clock,
    domain::{
        errors::ScheduleError,
        models::ChannelKind,
        repositories::MessageRepository,
        validation::{ValidationPolicy, validate},
    },
};

pub struct ScheduleMessageUseCase {
    repo: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    policy: ValidationPolicy,
}

pub struct ScheduleMessageRequest {
    pub channel: ChannelKind,
    pub destination: String,
    pub content: String,
    pub scheduled_time: String,
}

#[derive(Debug)]
pub struct ScheduleMessageResponse {
    pub message_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduleMessageUseCase {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        policy: ValidationPolicy,
    ) -> Self {
        Self {
            repo,
            clock,
            policy,
        }
    }

    /// Validates the request and stores it as pending. Nothing is written when
    /// validation fails.
    pub async fn execute(
        &self,
        request: ScheduleMessageRequest,
    ) -> Result<ScheduleMessageResponse, ScheduleError> {
        let message = validate(
            request.channel,
            &request.destination,
            &request.content,
            &request.scheduled_time,
            self.clock.now(),
            &self.policy,
        )
        .inspect_err(|err| debug!(channel = %request.channel, "schedule request rejected: {err}"))?;

        let stored = self.repo.create(message).await?;
        info!(
            message_id = %stored.id,
            channel = %stored.channel,
            scheduled_at = %stored.scheduled_at,
            "message scheduled"
        );

        Ok(ScheduleMessageResponse {
            message_id: stored.id,
            scheduled_at: stored.scheduled_at,
        })
    }
}
