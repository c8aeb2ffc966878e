use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{errors::ScheduleError, models::ScheduledMessage, repositories::MessageRepository};

pub struct GetMessageUseCase {
    repo: Arc<dyn MessageRepository>,
}

impl GetMessageUseCase {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, message_id: Uuid) -> Result<ScheduledMessage, ScheduleError> {
        self.repo
            .get(message_id)
            .await?
            .ok_or(ScheduleError::NotFound(message_id))
    }
}
