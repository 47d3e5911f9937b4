use async_trait::async_trait;
use napomni_models::reminder::ChatId;

/// Outbound delivery channel used by the due-reminder scan. A failure means
/// the reminder stays unsent and is retried on the next scan.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()>;
}
