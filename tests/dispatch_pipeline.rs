use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use deferred_messaging::{
    application::{
        handlers::message_dispatcher::{DispatcherConfig, MessageDispatcher},
        services::{
            clock::{Clock, ManualClock},
            notifier::{ChannelRegistry, DeliveryOutcome, NotificationChannel},
        },
        usecases::{
            get_message::GetMessageUseCase,
            schedule_message::{ScheduleMessageRequest, ScheduleMessageUseCase},
        },
    },
    domain::{
        errors::{ScheduleError, ValidationError},
        models::{ChannelKind, MessageStatus},
        repositories::MessageRepository,
        validation::ValidationPolicy,
    },
    infrastructure::repositories::in_memory::InMemoryMessageRepository,
};

/// Records every send and answers with whatever outcome is currently set.
struct RecordingChannel {
    kind: ChannelKind,
    outcome: Mutex<DeliveryOutcome>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    fn new(kind: ChannelKind, outcome: DeliveryOutcome) -> Arc<Self> {
        Arc::new(Self {
            kind,
            outcome: Mutex::new(outcome),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn set_outcome(&self, outcome: DeliveryOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, destination: &str, content: &str) -> DeliveryOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), content.to_string()));
        self.outcome.lock().unwrap().clone()
    }
}

struct Pipeline {
    clock: Arc<ManualClock>,
    repo: Arc<InMemoryMessageRepository>,
    schedule: ScheduleMessageUseCase,
    get: GetMessageUseCase,
    dispatcher: MessageDispatcher,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

fn pipeline(channels: Vec<Arc<dyn NotificationChannel>>) -> Pipeline {
    let clock = Arc::new(ManualClock::new(start()));
    let repo = Arc::new(InMemoryMessageRepository::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let dyn_repo: Arc<dyn MessageRepository> = repo.clone();

    Pipeline {
        schedule: ScheduleMessageUseCase::new(
            dyn_repo.clone(),
            dyn_clock.clone(),
            ValidationPolicy::default(),
        ),
        get: GetMessageUseCase::new(dyn_repo.clone()),
        dispatcher: MessageDispatcher::new(
            dyn_repo,
            ChannelRegistry::new(channels),
            dyn_clock,
            DispatcherConfig::default(),
        ),
        clock,
        repo,
    }
}

fn request(
    channel: ChannelKind,
    destination: &str,
    content: &str,
    at: &str,
) -> ScheduleMessageRequest {
    ScheduleMessageRequest {
        channel,
        destination: destination.to_string(),
        content: content.to_string(),
        scheduled_time: at.to_string(),
    }
}

#[tokio::test]
async fn scheduled_email_is_sent_once_after_it_falls_due() {
    let email = RecordingChannel::new(ChannelKind::Email, DeliveryOutcome::Delivered);
    let p = pipeline(vec![email.clone() as Arc<dyn NotificationChannel>]);

    let at = (start() + Duration::minutes(2)).to_rfc3339();
    let scheduled = p
        .schedule
        .execute(request(ChannelKind::Email, "user@example.com", "hello", &at))
        .await
        .unwrap();

    let early = p.dispatcher.run_once().await.unwrap();
    assert_eq!(early.due, 0);
    assert!(email.sent().is_empty());

    p.clock.advance(Duration::minutes(3));
    let report = p.dispatcher.run_once().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(
        email.sent(),
        vec![("user@example.com".to_string(), "hello".to_string())]
    );

    let stored = p.get.execute(scheduled.message_id).await.unwrap();
    assert_eq!(stored.status, MessageStatus::Sent);

    let again = p.dispatcher.run_once().await.unwrap();
    assert_eq!(again.due, 0);
    assert_eq!(email.sent().len(), 1);
}

#[tokio::test]
async fn rejected_message_stays_pending_and_is_retried_next_cycle() {
    let whatsapp = RecordingChannel::new(
        ChannelKind::Whatsapp,
        DeliveryOutcome::Rejected("provider down".to_string()),
    );
    let p = pipeline(vec![whatsapp.clone() as Arc<dyn NotificationChannel>]);

    let at = (start() + Duration::minutes(5)).to_rfc3339();
    let scheduled = p
        .schedule
        .execute(request(ChannelKind::Whatsapp, "+1 (555) 123-4567", "ping", &at))
        .await
        .unwrap();

    p.clock.advance(Duration::minutes(10));
    let first = p.dispatcher.run_once().await.unwrap();
    assert_eq!(first.rejected, 1);

    let stored = p.get.execute(scheduled.message_id).await.unwrap();
    assert_eq!(stored.status, MessageStatus::Pending);
    assert_eq!(stored.attempts, 1);
    assert_eq!(stored.last_error.as_deref(), Some("provider down"));

    whatsapp.set_outcome(DeliveryOutcome::Delivered);
    p.clock.advance(Duration::minutes(1));
    let second = p.dispatcher.run_once().await.unwrap();
    assert_eq!(second.delivered, 1);
    assert_eq!(whatsapp.sent().len(), 2);
    assert_eq!(whatsapp.sent()[1].0, "+15551234567");

    let stored = p.get.execute(scheduled.message_id).await.unwrap();
    assert_eq!(stored.status, MessageStatus::Sent);
}

#[tokio::test]
async fn oversized_whatsapp_message_is_rejected_without_a_write() {
    let p = pipeline(Vec::new());

    let at = (start() + Duration::hours(1)).to_rfc3339();
    let content = "a".repeat(4097);
    let err = p
        .schedule
        .execute(request(ChannelKind::Whatsapp, "+15551234567", &content, &at))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScheduleError::Validation(ValidationError::ContentTooLong {
            limit: 4096,
            actual: 4097
        })
    ));
    assert!(p.repo.is_empty().await);
}

#[tokio::test]
async fn time_without_offset_is_stored_as_utc() {
    let p = pipeline(Vec::new());

    let scheduled = p
        .schedule
        .execute(request(
            ChannelKind::Whatsapp,
            "+15551234567",
            "hi",
            "2025-01-01T10:00:00",
        ))
        .await
        .unwrap();

    let expected = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
    assert_eq!(scheduled.scheduled_at, expected);

    let stored = p.get.execute(scheduled.message_id).await.unwrap();
    assert_eq!(stored.scheduled_at, expected);
    assert_eq!(stored.status, MessageStatus::Pending);
}

#[tokio::test]
async fn time_inside_the_lead_window_is_rejected() {
    let p = pipeline(Vec::new());

    let at = (start() + Duration::seconds(60)).to_rfc3339();
    let err = p
        .schedule
        .execute(request(ChannelKind::Email, "user@example.com", "hello", &at))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScheduleError::Validation(ValidationError::TimeNotInFuture { .. })
    ));
    assert!(p.repo.is_empty().await);
}

#[tokio::test]
async fn each_message_goes_to_its_own_channel() {
    let email = RecordingChannel::new(ChannelKind::Email, DeliveryOutcome::Delivered);
    let whatsapp = RecordingChannel::new(
        ChannelKind::Whatsapp,
        DeliveryOutcome::Rejected("bad number".to_string()),
    );
    let p = pipeline(vec![
        email.clone() as Arc<dyn NotificationChannel>,
        whatsapp.clone() as Arc<dyn NotificationChannel>,
    ]);

    let at = (start() + Duration::minutes(2)).to_rfc3339();
    let mail = p
        .schedule
        .execute(request(ChannelKind::Email, "user@example.com", "mail", &at))
        .await
        .unwrap();
    let chat = p
        .schedule
        .execute(request(ChannelKind::Whatsapp, "+15551234567", "chat", &at))
        .await
        .unwrap();

    p.clock.advance(Duration::minutes(2));
    let report = p.dispatcher.run_once().await.unwrap();
    assert_eq!(report.due, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.rejected, 1);

    assert_eq!(
        p.get.execute(mail.message_id).await.unwrap().status,
        MessageStatus::Sent
    );
    assert_eq!(
        p.get.execute(chat.message_id).await.unwrap().status,
        MessageStatus::Pending
    );
}
