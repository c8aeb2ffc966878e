pub mod endpoints;
pub mod mappers;
pub mod requests;
pub mod responses;

use std::sync::Arc;

use poem::Route;
use poem_openapi::OpenApiService;

use crate::presentation::http::endpoints::{
    health::HealthEndpoints, messages::MessagesEndpoints, root::ApiState,
};

/// API under `/api`, Swagger UI at `/`.
pub fn build_app(state: ApiState, server_url: &str) -> Route {
    let api_service = OpenApiService::new(
        (HealthEndpoints, MessagesEndpoints::new(Arc::new(state))),
        "Deferred Messaging API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();

    Route::new().nest("/api", api_service).nest("/", ui)
}
