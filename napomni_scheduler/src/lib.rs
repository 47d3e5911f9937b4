mod notifier;
mod scheduler;

pub use notifier::Notifier;
pub use scheduler::{
    ActiveReminder, CreateReminderError, CreatedReminder, ReminderScheduler, ScanReport,
    DELIVERY_TIMEOUT,
};
