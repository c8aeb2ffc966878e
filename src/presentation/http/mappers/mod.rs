use crate::{
    application::usecases::schedule_message::ScheduleMessageRequest,
    domain::models::ScheduledMessage,
    presentation::http::{requests::ScheduleMessageRequestDto, responses::ScheduledMessageDto},
};

pub fn map_schedule_request(dto: ScheduleMessageRequestDto) -> ScheduleMessageRequest {
    ScheduleMessageRequest {
        channel: dto.channel.into(),
        destination: dto.recipient,
        content: dto.content,
        scheduled_time: dto.send_date,
    }
}

pub fn map_message(message: &ScheduledMessage) -> ScheduledMessageDto {
    ScheduledMessageDto {
        id: message.id,
        channel: message.channel.into(),
        recipient: message.destination.clone(),
        content: message.content.clone(),
        status: message.status.into(),
        send_date: message.scheduled_at.to_rfc3339(),
        attempts: message.attempts,
        last_error: message.last_error.clone(),
        created_at: message.created_at.to_rfc3339(),
        updated_at: message.updated_at.to_rfc3339(),
    }
}
