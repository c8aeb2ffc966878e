use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use crate::{
    application::services::notifier::{DeliveryOutcome, NotificationChannel},
    domain::models::ChannelKind,
};

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_EMAIL_SUBJECT: &str = "Scheduled message";

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub subject: String,
}

/// Plain-text email over an authenticated STARTTLS relay.
pub struct SmtpEmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl SmtpEmailChannel {
    pub fn new(config: SmtpConfig) -> anyhow::Result<Arc<dyn NotificationChannel>> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid SMTP_FROM address {:?}", config.from))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("invalid SMTP relay {}", config.host))?
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        Ok(Arc::new(Self {
            mailer,
            from,
            subject: config.subject,
        }) as Arc<dyn NotificationChannel>)
    }
}

#[async_trait]
impl NotificationChannel for SmtpEmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, destination: &str, content: &str) -> DeliveryOutcome {
        let to: Mailbox = match destination.parse() {
            Ok(to) => to,
            Err(err) => return DeliveryOutcome::Rejected(format!("invalid recipient: {err}")),
        };

        let email = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(content.to_string())
        {
            Ok(email) => email,
            Err(err) => return DeliveryOutcome::Rejected(format!("failed to build email: {err}")),
        };

        match self.mailer.send(email).await {
            Ok(response) => {
                info!(destination, code = %response.code(), "email accepted by relay");
                DeliveryOutcome::Delivered
            }
            Err(err) => DeliveryOutcome::Rejected(format!("smtp send failed: {err}")),
        }
    }
}
