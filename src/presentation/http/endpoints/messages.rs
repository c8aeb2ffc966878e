use std::sync::Arc;

use poem_openapi::{OpenApi, param::Path, payload::Json};
use tracing::error;
use uuid::Uuid;

use crate::{
    domain::errors::ScheduleError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{map_message, map_schedule_request},
        requests::ScheduleMessageRequestDto,
        responses::{
            ErrorDto, GetMessageResponse, INTERNAL_ERROR_MESSAGE, ScheduleMessageResponse,
            ScheduledDto,
        },
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(
        path = "/schedule",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn schedule_message(
        &self,
        request: Json<ScheduleMessageRequestDto>,
    ) -> ScheduleMessageResponse {
        let result = self
            .state
            .schedule_message_usecase
            .execute(map_schedule_request(request.0))
            .await;

        match result {
            Ok(response) => ScheduleMessageResponse::Created(Json(ScheduledDto {
                status: "success".to_string(),
                message: "Message scheduled.".to_string(),
                id: response.message_id,
                send_date: response.scheduled_at.to_rfc3339(),
            })),
            Err(ScheduleError::Validation(err)) => {
                ScheduleMessageResponse::BadRequest(ErrorDto::new(err.to_string()))
            }
            Err(err) => {
                error!(error = %err, "failed to schedule message");
                ScheduleMessageResponse::InternalError(ErrorDto::new(INTERNAL_ERROR_MESSAGE))
            }
        }
    }

    #[oai(
        path = "/messages/:message_id",
        method = "get",
        tag = EndpointsTags::Messages,
    )]
    pub async fn get_message(&self, message_id: Path<Uuid>) -> GetMessageResponse {
        match self.state.get_message_usecase.execute(message_id.0).await {
            Ok(message) => GetMessageResponse::Ok(Json(map_message(&message))),
            Err(ScheduleError::NotFound(id)) => {
                GetMessageResponse::NotFound(ErrorDto::new(format!("Message not found: {id}")))
            }
            Err(err) => {
                error!(error = %err, message_id = %message_id.0, "failed to load message");
                GetMessageResponse::InternalError(ErrorDto::new(INTERNAL_ERROR_MESSAGE))
            }
        }
    }
}
