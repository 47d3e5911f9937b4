mod memory;
mod reminder;
pub mod sqlite;

pub use memory::InMemoryReminderStorage;
pub use reminder::{NewReminder, ReminderStorage};
pub use sqlite::SqliteReminderStorage;

pub use sqlx;
