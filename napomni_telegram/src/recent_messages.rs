use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(60);

/// Time-bounded set of recently seen inbound message identifiers. Telegram
/// may redeliver an update; anything seen within the TTL is dropped before
/// it reaches the scheduler. Expired entries are purged on access.
pub struct RecentMessages {
    ttl: Duration,
    seen: Mutex<HashMap<(i64, i32), Instant>>,
}

impl RecentMessages {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true the first time a `(chat, message)` pair shows up within
    /// the TTL window, false for every repeat.
    pub fn first_seen(&self, chat_id: i64, message_id: i32) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().expect("seen-set mutex poisoned");

        seen.retain(|_, at| now.duration_since(*at) < self.ttl);

        match seen.entry((chat_id, message_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }
}

impl Default for RecentMessages {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_message_is_suppressed() {
        let recent = RecentMessages::default();

        assert!(recent.first_seen(1, 10));
        assert!(!recent.first_seen(1, 10));
        assert!(!recent.first_seen(1, 10));
    }

    #[tokio::test]
    async fn distinct_messages_and_chats_pass() {
        let recent = RecentMessages::default();

        assert!(recent.first_seen(1, 10));
        assert!(recent.first_seen(1, 11));
        assert!(recent.first_seen(2, 10));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_the_ttl() {
        let recent = RecentMessages::new(Duration::from_secs(60));

        assert!(recent.first_seen(1, 10));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!recent.first_seen(1, 10));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(recent.first_seen(1, 10));
    }
}
