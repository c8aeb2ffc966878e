use poem_openapi::{ApiResponse, Object, payload::Json};
use uuid::Uuid;

use crate::presentation::models::{ChannelKindDto, MessageStatusDto};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error while processing the request.";

#[derive(Object)]
pub struct ScheduledDto {
    pub status: String,
    pub message: String,
    pub id: Uuid,
    pub send_date: String,
}

#[derive(Object)]
pub struct ErrorDto {
    pub status: String,
    pub message: String,
}

impl ErrorDto {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error".to_string(),
            message: message.into(),
        })
    }
}

#[derive(Object)]
pub struct ScheduledMessageDto {
    pub id: Uuid,
    pub channel: ChannelKindDto,
    pub recipient: String,
    pub content: String,
    pub status: MessageStatusDto,
    pub send_date: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ApiResponse)]
#[oai(bad_request_handler = "schedule_bad_request")]
pub enum ScheduleMessageResponse {
    #[oai(status = 201)]
    Created(Json<ScheduledDto>),
    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),
    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

/// Unparseable or incomplete bodies get the same error shape as validation failures.
fn schedule_bad_request(err: poem::Error) -> ScheduleMessageResponse {
    ScheduleMessageResponse::BadRequest(ErrorDto::new(err.to_string()))
}

#[derive(ApiResponse)]
pub enum GetMessageResponse {
    #[oai(status = 200)]
    Ok(Json<ScheduledMessageDto>),
    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),
    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}
