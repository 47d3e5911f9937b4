use std::sync::Arc;
use std::time::Duration;

use napomni_models::chrono::{DateTime, TimeDelta, Utc};
use napomni_models::reminder::{ChatId, Reminder};
use napomni_storage::{NewReminder, ReminderStorage};
use napomni_time::{ResolvedTime, TimeParseError, TimeResolver};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::Notifier;

/// Upper bound on a single delivery attempt. A hung notifier call counts as
/// a delivery failure and the row is retried on the next scan.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CreateReminderError {
    /// Time string rejected; the message is meant for the end user.
    #[error(transparent)]
    Rejected(#[from] TimeParseError),
    #[error("failed to store the reminder")]
    Store(#[source] anyhow::Error),
}

pub struct CreatedReminder {
    pub reminder: Reminder,
    /// Wall-clock rendering in the reference offset, for the confirmation
    /// message.
    pub display: String,
}

pub struct ActiveReminder {
    pub reminder: Reminder,
    /// Time left until `due_at`; zero or negative means overdue and
    /// pending dispatch.
    pub remaining: TimeDelta,
    pub display: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Owns the reminder store and drives due-reminder dispatch.
///
/// Deliveries are at-least-once: a row is marked sent only after the
/// notifier reports success, and failed rows are retried on every
/// subsequent scan with no cap.
pub struct ReminderScheduler {
    storage: Arc<dyn ReminderStorage>,
    notifier: Arc<dyn Notifier>,
    resolver: TimeResolver,
    // Scans must never overlap: a slow delivery spanning past the next
    // timer tick would otherwise re-select the same still-unsent row.
    scan_lock: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        storage: Arc<dyn ReminderStorage>,
        notifier: Arc<dyn Notifier>,
        resolver: TimeResolver,
    ) -> Self {
        Self {
            storage,
            notifier,
            resolver,
            scan_lock: Mutex::new(()),
        }
    }

    pub fn resolver(&self) -> &TimeResolver {
        &self.resolver
    }

    pub async fn create(
        &self,
        chat_id: ChatId,
        text: String,
        raw_time: &str,
        now: DateTime<Utc>,
    ) -> Result<CreatedReminder, CreateReminderError> {
        let ResolvedTime { due_at, display } = self.resolver.resolve(raw_time, now)?;

        let reminder = self
            .storage
            .insert(NewReminder {
                chat_id,
                text,
                due_at,
                created_at: now,
            })
            .await
            .map_err(CreateReminderError::Store)?;

        log::info!(
            "Created reminder {} for chat {}, due at {}",
            reminder.id,
            chat_id,
            reminder.due_at
        );

        Ok(CreatedReminder { reminder, display })
    }

    /// Every reminder of the chat, sent and unsent, ordered by due time and
    /// annotated with the time remaining relative to `now`.
    pub async fn list_active(
        &self,
        chat_id: ChatId,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ActiveReminder>> {
        let reminders = self.storage.list_for_chat(chat_id).await?;

        Ok(reminders
            .into_iter()
            .map(|reminder| ActiveReminder {
                remaining: reminder.due_at - now,
                display: self.resolver.display(reminder.due_at),
                reminder,
            })
            .collect())
    }

    pub async fn clear_all(&self, chat_id: ChatId) -> anyhow::Result<u64> {
        let removed = self.storage.delete_for_chat(chat_id).await?;
        log::info!("Removed {removed} reminder(s) for chat {chat_id}");

        Ok(removed)
    }

    /// Selects every unsent row with `due_at <= now` and delivers each one
    /// concurrently. One row's failure never aborts its siblings.
    pub async fn scan_and_dispatch(&self, now: DateTime<Utc>) -> anyhow::Result<ScanReport> {
        let _scan = self.scan_lock.lock().await;

        let due = self.storage.due_unsent(now).await?;
        let mut report = ScanReport {
            selected: due.len(),
            ..ScanReport::default()
        };

        if due.is_empty() {
            log::debug!("No due reminders");
            return Ok(report);
        }

        log::info!("Dispatching {} due reminder(s)", due.len());

        let mut deliveries = JoinSet::new();
        for reminder in due {
            let storage = Arc::clone(&self.storage);
            let notifier = Arc::clone(&self.notifier);
            deliveries.spawn(async move { dispatch_one(reminder, storage, notifier).await });
        }

        while let Some(delivery) = deliveries.join_next().await {
            match delivery {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.failed += 1,
                Err(err) => {
                    report.failed += 1;
                    log::error!("Delivery task failed to run: {err}");
                }
            }
        }

        Ok(report)
    }

    /// Periodic scan loop. Runs until the token is cancelled; scan errors
    /// are logged and the loop keeps going.
    pub async fn run(self: Arc<Self>, scan_interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Reminder scan loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.scan_and_dispatch(Utc::now()).await {
                        Ok(report) if report.selected > 0 => {
                            log::info!(
                                "Scan finished: {} delivered, {} failed",
                                report.delivered,
                                report.failed
                            );
                        }
                        Ok(_) => {}
                        Err(err) => log::error!("Reminder scan failed: {err:#}"),
                    }
                }
            }
        }
    }
}

/// Delivers a single row and flips its `sent` flag. Returns whether the
/// reminder is done; on any failure it stays a candidate for the next scan.
async fn dispatch_one(
    reminder: Reminder,
    storage: Arc<dyn ReminderStorage>,
    notifier: Arc<dyn Notifier>,
) -> bool {
    let id = reminder.id;
    let attempt = notifier.notify(reminder.chat_id, &reminder.text);

    match tokio::time::timeout(DELIVERY_TIMEOUT, attempt).await {
        Ok(Ok(())) => match storage.mark_sent(id).await {
            Ok(()) => {
                log::info!("Reminder {id} delivered to chat {}", reminder.chat_id);
                true
            }
            Err(err) => {
                log::error!(
                    "Storage error while marking reminder {id} sent, it will be redelivered: {err:#}"
                );
                false
            }
        },
        Ok(Err(err)) => {
            log::warn!("Delivery of reminder {id} failed, will retry next scan: {err:#}");
            false
        }
        Err(_) => {
            log::warn!(
                "Delivery of reminder {id} timed out after {DELIVERY_TIMEOUT:?}, will retry next scan"
            );
            false
        }
    }
}
