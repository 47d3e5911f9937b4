use chrono::{DateTime, Utc};

pub type ReminderId = i64;

/// Telegram chat the reminder belongs to and will be delivered to.
pub type ChatId = i64;

/// A single scheduled notification. Everything except `sent` is immutable
/// after insertion; `sent` only ever goes `false -> true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,
    pub chat_id: ChatId,
    pub text: String,
    pub due_at: DateTime<Utc>,
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.sent && self.due_at <= now
    }
}
