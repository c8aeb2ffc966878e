use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    application::services::{
        clock::Clock,
        notifier::{ChannelRegistry, DeliveryOutcome},
    },
    domain::{
        errors::StoreError,
        models::{MarkSentOutcome, ScheduledMessage},
        repositories::MessageRepository,
    },
};

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Time between the starts of consecutive cycles. Must be non-zero.
    pub poll_interval: Duration,
    /// Sends in flight at once within a cycle. `1` dispatches sequentially.
    pub max_concurrent_sends: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS),
            max_concurrent_sends: 1,
        }
    }
}

/// Tally of one dispatch cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub due: usize,
    pub delivered: usize,
    /// Delivered, but another dispatcher marked the message sent first.
    pub already_sent: usize,
    pub rejected: usize,
    /// Delivered, but the status update failed. These will be sent again.
    pub mark_failed: usize,
}

impl CycleReport {
    fn record(&mut self, result: DispatchResult) {
        match result {
            DispatchResult::Delivered => self.delivered += 1,
            DispatchResult::AlreadySent => self.already_sent += 1,
            DispatchResult::Rejected => self.rejected += 1,
            DispatchResult::MarkFailed => self.mark_failed += 1,
        }
    }
}

enum DispatchResult {
    Delivered,
    AlreadySent,
    Rejected,
    MarkFailed,
}

/// Polls the store for due messages and hands them to their channels.
///
/// There is no retry state: a message stays `Pending` until a send succeeds,
/// and every cycle picks up whatever is still pending and due. The pending
/// status itself is the retry queue.
pub struct MessageDispatcher {
    repo: Arc<dyn MessageRepository>,
    channels: ChannelRegistry,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl MessageDispatcher {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        channels: ChannelRegistry,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            repo,
            channels,
            clock,
            config,
        }
    }

    /// Runs one cycle at the clock's current time.
    pub async fn run_once(&self) -> Result<CycleReport, StoreError> {
        self.run_cycle(self.clock.now()).await
    }

    /// Query due, send all, update all. Only a failed query aborts the cycle;
    /// per-message failures are logged and counted.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, StoreError> {
        let due = self.repo.query_due(now).await?;
        let mut report = CycleReport {
            due: due.len(),
            ..CycleReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        let concurrency = self.config.max_concurrent_sends.max(1);
        let mut results = stream::iter(due)
            .map(|message| self.dispatch(message))
            .buffer_unordered(concurrency);
        while let Some(result) = results.next().await {
            report.record(result);
        }

        Ok(report)
    }

    async fn dispatch(&self, message: ScheduledMessage) -> DispatchResult {
        let outcome = self
            .channels
            .send(message.channel, &message.destination, &message.content)
            .await;

        match outcome {
            DeliveryOutcome::Delivered => match self.repo.mark_sent(message.id).await {
                Ok(MarkSentOutcome::Transitioned) => {
                    info!(message_id = %message.id, channel = %message.channel, "message sent");
                    DispatchResult::Delivered
                }
                Ok(MarkSentOutcome::AlreadySent) => {
                    warn!(
                        message_id = %message.id,
                        "message was already marked sent by another dispatcher; delivered twice"
                    );
                    DispatchResult::AlreadySent
                }
                Err(err) => {
                    error!(
                        message_id = %message.id,
                        error = %err,
                        "message delivered but could not be marked sent; it stays pending and will be delivered again"
                    );
                    DispatchResult::MarkFailed
                }
            },
            DeliveryOutcome::Rejected(reason) => {
                warn!(
                    message_id = %message.id,
                    channel = %message.channel,
                    attempts = message.attempts + 1,
                    "send rejected, message stays pending: {reason}"
                );
                if let Err(err) = self.repo.record_failure(message.id, &reason).await {
                    warn!(message_id = %message.id, error = %err, "failed to record send failure");
                }
                DispatchResult::Rejected
            }
        }
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Runs cycles on a fixed interval until `cancel` fires. The token is only
    /// observed between cycles, so a cycle in progress always completes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval = ?self.config.poll_interval, "message dispatcher started");

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("message dispatcher stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.run_once().await {
                Ok(report) if report.due == 0 => debug!("no due messages"),
                Ok(report) => info!(
                    due = report.due,
                    delivered = report.delivered,
                    already_sent = report.already_sent,
                    rejected = report.rejected,
                    mark_failed = report.mark_failed,
                    "dispatch cycle finished"
                ),
                Err(err) => error!(error = %err, "dispatch cycle aborted: could not query due messages"),
            }
        }
    }
}
