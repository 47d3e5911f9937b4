use async_trait::async_trait;
use napomni_models::reminder::ChatId;
use napomni_scheduler::Notifier;
use teloxide::prelude::*;

/// Delivers due reminders back through the bot.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.bot
            .send_message(
                teloxide::types::ChatId(chat_id),
                format!("⏰ Reminder: {text}"),
            )
            .await?;

        Ok(())
    }
}
