use async_trait::async_trait;
use napomni_models::chrono::{DateTime, Utc};
use napomni_models::reminder::{ChatId, Reminder, ReminderId};

pub struct NewReminder {
    pub chat_id: ChatId,
    pub text: String,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Durable reminder table. The store is the single source of truth; every
/// mutation is atomic per row or per operation.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    /// Inserts with `sent = false` and returns the row with its assigned id.
    async fn insert(&self, reminder: NewReminder) -> anyhow::Result<Reminder>;

    /// All reminders of one chat, sent and unsent, ordered by `due_at`.
    async fn list_for_chat(&self, chat_id: ChatId) -> anyhow::Result<Vec<Reminder>>;

    /// Rows with `sent = false` and `due_at <= now`, in no particular order.
    async fn due_unsent(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>>;

    /// Flips `sent` to true for a single row.
    async fn mark_sent(&self, id: ReminderId) -> anyhow::Result<()>;

    /// Deletes every reminder of one chat, returns the removed row count.
    async fn delete_for_chat(&self, chat_id: ChatId) -> anyhow::Result<u64>;
}
