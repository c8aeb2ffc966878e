use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use deferred_messaging::{
    application::{
        handlers::message_dispatcher::MessageDispatcher,
        services::{
            clock::{Clock, SystemClock},
            notifier::{ChannelRegistry, NotificationChannel},
        },
        usecases::{get_message::GetMessageUseCase, schedule_message::ScheduleMessageUseCase},
    },
    config::Config,
    domain::{models::ChannelKind, repositories::MessageRepository},
    infrastructure::{
        messaging::{
            dry_run::DryRunChannel, email::SmtpEmailChannel, whatsapp::WhatsappCloudChannel,
        },
        repositories::{in_memory::InMemoryMessageRepository, postgres::PostgresMessageRepository},
    },
    presentation::http::{build_app, endpoints::root::ApiState},
};
use poem::{Server, listener::TcpListener};
use tokio::main;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::try_parse().context("failed to load configuration")?;

    let repo = build_repository(&config).await?;
    let channels = build_channels(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = ApiState {
        schedule_message_usecase: Arc::new(ScheduleMessageUseCase::new(
            repo.clone(),
            clock.clone(),
            config.validation_policy(),
        )),
        get_message_usecase: Arc::new(GetMessageUseCase::new(repo.clone())),
    };

    let dispatcher = Arc::new(MessageDispatcher::new(
        repo,
        channels,
        clock,
        config.dispatcher_config(),
    ));
    let cancel = CancellationToken::new();
    let dispatcher_handle = dispatcher.spawn(cancel.clone());

    let server_url = config.server_url();
    let app = build_app(state, &server_url);

    info!("Starting server at {}", server_url);

    Server::new(TcpListener::bind(format!("localhost:{}", config.port)))
        .run_with_graceful_shutdown(
            app,
            async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            },
            Some(Duration::from_secs(10)),
        )
        .await
        .context("http server failed")?;

    cancel.cancel();
    dispatcher_handle
        .await
        .context("dispatcher task panicked")?;

    Ok(())
}

/// Connects, migrates and probes the database before anything else starts, so
/// a misconfigured store stops the process instead of a dispatcher that can
/// never succeed.
async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn MessageRepository>> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set; using the in-memory store, scheduled messages will not survive a restart");
        return Ok(Arc::new(InMemoryMessageRepository::new()) as Arc<dyn MessageRepository>);
    };

    let repo = PostgresMessageRepository::connect(url, config.database_max_connections)
        .await
        .context("failed to connect to the message store")?;
    repo.migrate()
        .await
        .context("failed to run message store migrations")?;
    repo.ping()
        .await
        .context("message store did not answer")?;

    info!("connected to postgres message store");
    Ok(repo as Arc<dyn MessageRepository>)
}

fn build_channels(config: &Config) -> anyhow::Result<ChannelRegistry> {
    let whatsapp: Arc<dyn NotificationChannel> = match config.whatsapp.clone() {
        Some(whatsapp) => WhatsappCloudChannel::new(whatsapp)?,
        None => {
            warn!("WHATSAPP_API_TOKEN or WHATSAPP_PHONE_ID missing; whatsapp messages will be logged, not sent");
            DryRunChannel::new(ChannelKind::Whatsapp)
        }
    };

    let email: Arc<dyn NotificationChannel> = match config.smtp.clone() {
        Some(smtp) => SmtpEmailChannel::new(smtp)?,
        None => {
            warn!("SMTP_HOST missing; email messages will be logged, not sent");
            DryRunChannel::new(ChannelKind::Email)
        }
    };

    Ok(ChannelRegistry::new(vec![whatsapp, email]))
}
