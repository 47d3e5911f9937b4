use napomni_models::chrono::{DateTime, Utc};
use napomni_models::reminder::Reminder;

/// Row shape of the `reminders` table. Timestamps are unix seconds so
/// `due_at <= now` stays a plain integer comparison.
#[derive(sqlx::FromRow)]
pub struct ReminderRow {
    pub id: i64,
    pub chat_id: i64,
    pub text: String,
    pub due_at: i64,
    pub sent: bool,
    pub created_at: i64,
}

impl From<ReminderRow> for Reminder {
    fn from(value: ReminderRow) -> Self {
        Self {
            id: value.id,
            chat_id: value.chat_id,
            text: value.text,
            due_at: from_unix_seconds(value.due_at),
            sent: value.sent,
            created_at: from_unix_seconds(value.created_at),
        }
    }
}

fn from_unix_seconds(seconds: i64) -> DateTime<Utc> {
    // Rows are only ever written from valid instants; a corrupt value
    // decodes to the epoch instead of poisoning the whole query.
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}
