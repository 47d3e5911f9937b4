use std::collections::HashMap;

use async_trait::async_trait;
use napomni_models::chrono::{DateTime, Timelike, Utc};
use napomni_models::reminder::{ChatId, Reminder, ReminderId};
use tokio::sync::RwLock;

use crate::{NewReminder, ReminderStorage};

struct InMemoryStore {
    next_id: ReminderId,
    reminders: HashMap<ReminderId, Reminder>,
}

/// Map-backed storage, mainly for tests. Does not survive restarts.
pub struct InMemoryReminderStorage {
    store: RwLock<InMemoryStore>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        InMemoryReminderStorage {
            store: RwLock::new(InMemoryStore {
                next_id: 1,
                reminders: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryReminderStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    async fn insert(&self, reminder: NewReminder) -> anyhow::Result<Reminder> {
        let mut store = self.store.write().await;
        let id = store.next_id;
        store.next_id += 1;

        let inserted = Reminder {
            id,
            chat_id: reminder.chat_id,
            text: reminder.text,
            due_at: truncate_to_second(reminder.due_at),
            sent: false,
            created_at: truncate_to_second(reminder.created_at),
        };
        store.reminders.insert(id, inserted.clone());
        log::debug!("Inserted reminder {id} for chat {}", inserted.chat_id);

        Ok(inserted)
    }

    async fn list_for_chat(&self, chat_id: ChatId) -> anyhow::Result<Vec<Reminder>> {
        let store = self.store.read().await;
        let mut reminders: Vec<_> = store
            .reminders
            .values()
            .filter(|r| r.chat_id == chat_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| (r.due_at, r.id));

        Ok(reminders)
    }

    async fn due_unsent(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>> {
        let store = self.store.read().await;
        Ok(store
            .reminders
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect())
    }

    async fn mark_sent(&self, id: ReminderId) -> anyhow::Result<()> {
        let mut store = self.store.write().await;
        if let Some(reminder) = store.reminders.get_mut(&id) {
            reminder.sent = true;
            Ok(())
        } else {
            anyhow::bail!("no reminder with id {id}");
        }
    }

    async fn delete_for_chat(&self, chat_id: ChatId) -> anyhow::Result<u64> {
        let mut store = self.store.write().await;
        let before = store.reminders.len();
        store.reminders.retain(|_, r| r.chat_id != chat_id);
        let removed = (before - store.reminders.len()) as u64;
        log::debug!("Deleted {removed} reminder(s) for chat {chat_id}");

        Ok(removed)
    }
}

/// Second precision, matching what the SQLite backend persists.
fn truncate_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_nanosecond(0)
        .expect("zeroing nanoseconds never fails")
}

#[cfg(test)]
mod tests {
    use napomni_models::chrono::{TimeDelta, TimeZone};

    use super::*;

    fn storage() -> InMemoryReminderStorage {
        InMemoryReminderStorage::new()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn new_reminder(chat_id: ChatId, text: &str, due_at: DateTime<Utc>) -> NewReminder {
        NewReminder {
            chat_id,
            text: text.to_owned(),
            due_at,
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_unique_monotonic_ids() {
        let storage = storage();

        let first = storage
            .insert(new_reminder(1, "a", now() + TimeDelta::minutes(5)))
            .await
            .unwrap();
        let second = storage
            .insert(new_reminder(1, "b", now() + TimeDelta::minutes(5)))
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert!(!first.sent);
    }

    #[tokio::test]
    async fn list_is_ordered_by_due_time() {
        let storage = storage();
        let later = now() + TimeDelta::hours(2);
        let sooner = now() + TimeDelta::minutes(10);

        storage.insert(new_reminder(1, "later", later)).await.unwrap();
        storage.insert(new_reminder(1, "sooner", sooner)).await.unwrap();
        storage.insert(new_reminder(2, "other chat", sooner)).await.unwrap();

        let listed = storage.list_for_chat(1).await.unwrap();

        let texts: Vec<_> = listed.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["sooner", "later"]);
    }

    #[tokio::test]
    async fn due_unsent_skips_future_and_sent_rows() {
        let storage = storage();
        let due = storage
            .insert(new_reminder(1, "due", now() - TimeDelta::minutes(1)))
            .await
            .unwrap();
        let already_sent = storage
            .insert(new_reminder(1, "sent", now() - TimeDelta::minutes(1)))
            .await
            .unwrap();
        storage
            .insert(new_reminder(1, "future", now() + TimeDelta::minutes(1)))
            .await
            .unwrap();
        storage.mark_sent(already_sent.id).await.unwrap();

        let selected = storage.due_unsent(now()).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, due.id);
    }

    #[tokio::test]
    async fn marking_an_unknown_id_fails() {
        let storage = storage();

        assert!(storage.mark_sent(42).await.is_err());
    }

    #[tokio::test]
    async fn timestamps_are_truncated_to_whole_seconds() {
        let storage = storage();
        let noisy = now().with_nanosecond(987_654_321).unwrap();

        let inserted = storage
            .insert(NewReminder {
                chat_id: 1,
                text: "x".to_owned(),
                due_at: noisy + TimeDelta::minutes(5),
                created_at: noisy,
            })
            .await
            .unwrap();

        // Same precision as the SQLite backend, which stores unix seconds.
        assert_eq!(inserted.created_at, now());
        assert_eq!(inserted.due_at, now() + TimeDelta::minutes(5));
    }

    #[tokio::test]
    async fn delete_removes_only_the_requested_chat() {
        let storage = storage();
        storage
            .insert(new_reminder(1, "a", now() + TimeDelta::minutes(5)))
            .await
            .unwrap();
        storage
            .insert(new_reminder(1, "b", now() + TimeDelta::minutes(6)))
            .await
            .unwrap();
        storage
            .insert(new_reminder(2, "keep", now() + TimeDelta::minutes(7)))
            .await
            .unwrap();

        let removed = storage.delete_for_chat(1).await.unwrap();

        assert_eq!(removed, 2);
        assert!(storage.list_for_chat(1).await.unwrap().is_empty());
        assert_eq!(storage.list_for_chat(2).await.unwrap().len(), 1);
    }
}
