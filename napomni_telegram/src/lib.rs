mod commands;
mod notifier;
mod recent_messages;

pub use notifier::TelegramNotifier;
pub use recent_messages::{DEFAULT_MESSAGE_TTL, RecentMessages};
pub use teloxide;

use std::sync::Arc;

use napomni_scheduler::ReminderScheduler;
use teloxide::prelude::*;

use commands::Command;

type HandlerResult = anyhow::Result<()>;

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    /// Runs the long-polling dispatcher until ctrl-c. Every inbound command
    /// passes the duplicate-message guard before it reaches the scheduler.
    pub async fn start(
        bot: Bot,
        scheduler: Arc<ReminderScheduler>,
        recent_messages: Arc<RecentMessages>,
    ) {
        log::info!("Starting Telegram interaction interface");

        let schema = Update::filter_message().branch(
            teloxide::filter_command::<Command, _>().endpoint(commands::handle_command),
        );

        Dispatcher::builder(bot, schema)
            .dependencies(teloxide::dptree::deps![scheduler, recent_messages])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }
}
