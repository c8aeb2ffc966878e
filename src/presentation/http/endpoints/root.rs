use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::usecases::{
    get_message::GetMessageUseCase, schedule_message::ScheduleMessageUseCase,
};

#[derive(Clone)]
pub struct ApiState {
    pub schedule_message_usecase: Arc<ScheduleMessageUseCase>,
    pub get_message_usecase: Arc<GetMessageUseCase>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Messages,
}
