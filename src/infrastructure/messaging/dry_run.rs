use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    application::services::notifier::{DeliveryOutcome, NotificationChannel},
    domain::models::ChannelKind,
};

/// Stands in for a provider whose credentials are not configured. Logs the
/// message and reports it delivered.
pub struct DryRunChannel {
    kind: ChannelKind,
}

impl DryRunChannel {
    pub fn new(kind: ChannelKind) -> Arc<dyn NotificationChannel> {
        Arc::new(Self { kind }) as Arc<dyn NotificationChannel>
    }
}

#[async_trait]
impl NotificationChannel for DryRunChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, destination: &str, content: &str) -> DeliveryOutcome {
        info!(
            channel = %self.kind,
            destination,
            chars = content.chars().count(),
            "[dry-run] not sending, provider not configured"
        );
        DeliveryOutcome::Delivered
    }
}
