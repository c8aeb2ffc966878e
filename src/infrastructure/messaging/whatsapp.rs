use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    application::services::notifier::{DeliveryOutcome, NotificationChannel},
    domain::models::ChannelKind,
};

pub const DEFAULT_WHATSAPP_API_BASE: &str = "https://graph.facebook.com/v19.0";

#[derive(Debug, Clone)]
pub struct WhatsappConfig {
    pub api_base: String,
    pub phone_number_id: String,
    pub access_token: String,
}

/// Text messages through the Meta WhatsApp Cloud API.
pub struct WhatsappCloudChannel {
    http: Client,
    config: WhatsappConfig,
}

impl WhatsappCloudChannel {
    pub fn new(config: WhatsappConfig) -> anyhow::Result<Arc<dyn NotificationChannel>> {
        let http = Client::builder()
            .user_agent("deferred-messaging/whatsapp")
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build whatsapp client")?;

        Ok(Arc::new(Self { http, config }) as Arc<dyn NotificationChannel>)
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }
}

#[async_trait]
impl NotificationChannel for WhatsappCloudChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send(&self, destination: &str, content: &str) -> DeliveryOutcome {
        let payload = WhatsappTextMessage {
            messaging_product: "whatsapp",
            to: destination.trim_start_matches('+'),
            message_type: "text",
            text: WhatsappText { body: content },
        };

        let response = match self
            .http
            .post(self.build_url())
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return DeliveryOutcome::Rejected(format!("whatsapp request failed: {err}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return DeliveryOutcome::Rejected(format!("whatsapp api returned {status}: {body}"));
        }

        let provider_id = response
            .json::<WhatsappSendResponse>()
            .await
            .ok()
            .and_then(|body| body.messages.into_iter().next())
            .map(|message| message.id);
        info!(
            destination,
            provider_id = provider_id.as_deref().unwrap_or("unknown"),
            "whatsapp message accepted"
        );

        DeliveryOutcome::Delivered
    }
}

#[derive(Debug, Serialize)]
struct WhatsappTextMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: WhatsappText<'a>,
}

#[derive(Debug, Serialize)]
struct WhatsappText<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct WhatsappSendResponse {
    #[serde(default)]
    messages: Vec<WhatsappMessageId>,
}

#[derive(Debug, Deserialize)]
struct WhatsappMessageId {
    id: String,
}
