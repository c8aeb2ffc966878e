use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::ChannelKind;

/// Two-outcome result of handing a message to an outbound provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Provider refusal or transport failure, with a diagnostic for the logs.
    Rejected(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Outbound provider boundary. Implementations map every failure, network
/// errors included, to [`DeliveryOutcome::Rejected`].
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;
    async fn send(&self, destination: &str, content: &str) -> DeliveryOutcome;
}

#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        let mut map = HashMap::new();
        for channel in channels {
            map.insert(channel.kind(), channel);
        }
        Self { channels: map }
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn NotificationChannel>> {
        self.channels.get(&kind).cloned()
    }

    /// Sends through the channel registered for `kind`. A missing channel is a
    /// rejection, so the message stays pending until one is configured.
    pub async fn send(&self, kind: ChannelKind, destination: &str, content: &str) -> DeliveryOutcome {
        match self.get(kind) {
            Some(channel) => channel.send(destination, content).await,
            None => DeliveryOutcome::Rejected(format!("no channel registered for {kind}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ChannelKind, DeliveryOutcome);

    #[async_trait]
    impl NotificationChannel for Fixed {
        fn kind(&self) -> ChannelKind {
            self.0
        }

        async fn send(&self, _destination: &str, _content: &str) -> DeliveryOutcome {
            self.1.clone()
        }
    }

    #[tokio::test]
    async fn routes_by_channel_kind() {
        let registry = ChannelRegistry::new(vec![
            Arc::new(Fixed(ChannelKind::Email, DeliveryOutcome::Delivered))
                as Arc<dyn NotificationChannel>,
            Arc::new(Fixed(
                ChannelKind::Whatsapp,
                DeliveryOutcome::Rejected("nope".into()),
            )),
        ]);

        assert_eq!(
            registry.send(ChannelKind::Email, "user@example.com", "hi").await,
            DeliveryOutcome::Delivered
        );
        assert_eq!(
            registry.send(ChannelKind::Whatsapp, "+5514996509334", "hi").await,
            DeliveryOutcome::Rejected("nope".into())
        );
    }

    #[tokio::test]
    async fn missing_channel_is_a_rejection() {
        let registry = ChannelRegistry::default();
        let outcome = registry.send(ChannelKind::Email, "user@example.com", "hi").await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected("no channel registered for email".into())
        );
    }
}
