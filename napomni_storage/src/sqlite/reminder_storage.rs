mod model;

use async_trait::async_trait;
use model::ReminderRow;
use napomni_models::chrono::{DateTime, Utc};
use napomni_models::reminder::{ChatId, Reminder, ReminderId};
use sqlx::SqlitePool;

use crate::{NewReminder, ReminderStorage};

const SELECT_COLUMNS: &str = "id, chat_id, text, due_at, sent, created_at";

pub struct SqliteReminderStorage {
    pool: SqlitePool,
}

impl SqliteReminderStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the reminders table if it is missing. Run once at startup.
    pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reminders (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id    INTEGER NOT NULL,
                text       TEXT    NOT NULL,
                due_at     INTEGER NOT NULL,
                sent       INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reminders_due
             ON reminders (sent, due_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ReminderStorage for SqliteReminderStorage {
    async fn insert(&self, reminder: NewReminder) -> anyhow::Result<Reminder> {
        let query = format!(
            "INSERT INTO reminders (chat_id, text, due_at, sent, created_at)
             VALUES (?, ?, ?, 0, ?) RETURNING {SELECT_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ReminderRow>(&query)
            .bind(reminder.chat_id)
            .bind(&reminder.text)
            .bind(reminder.due_at.timestamp())
            .bind(reminder.created_at.timestamp())
            .fetch_one(&self.pool)
            .await?;

        log::debug!(
            "Inserted reminder {} for chat {}",
            inserted.id,
            inserted.chat_id
        );

        Ok(inserted.into())
    }

    async fn list_for_chat(&self, chat_id: ChatId) -> anyhow::Result<Vec<Reminder>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM reminders
             WHERE chat_id = ? ORDER BY due_at, id"
        );
        let rows = sqlx::query_as::<_, ReminderRow>(&query)
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn due_unsent(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM reminders
             WHERE sent = 0 AND due_at <= ?"
        );
        let rows = sqlx::query_as::<_, ReminderRow>(&query)
            .bind(now.timestamp())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_sent(&self, id: ReminderId) -> anyhow::Result<()> {
        let updated = sqlx::query("UPDATE reminders SET sent = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            anyhow::bail!("no reminder with id {id}");
        }

        Ok(())
    }

    async fn delete_for_chat(&self, chat_id: ChatId) -> anyhow::Result<u64> {
        let deleted = sqlx::query("DELETE FROM reminders WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        let removed = deleted.rows_affected();
        log::debug!("Deleted {removed} reminder(s) for chat {chat_id}");

        Ok(removed)
    }
}
