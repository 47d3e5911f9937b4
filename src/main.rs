mod appsettings;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use napomni_scheduler::ReminderScheduler;
use napomni_storage::SqliteReminderStorage;
use napomni_storage::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use napomni_telegram::teloxide::Bot;
use napomni_telegram::{RecentMessages, TelegramInteractionInterface, TelegramNotifier};
use napomni_time::TimeResolver;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    let settings = appsettings::AppSettings::new().context("failed to load settings")?;

    let connect_options = SqliteConnectOptions::from_str(&settings.database.url)
        .context("invalid database url")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .context("failed to open the reminder database")?;
    SqliteReminderStorage::migrate(&pool).await?;
    log::info!("Reminder database ready at {}", settings.database.url);

    let resolver = TimeResolver::from_offset_hours(settings.time.utc_offset_hours)
        .context("time.utc_offset_hours is out of range")?;

    let bot = Bot::new(settings.telegram.token.clone());
    let storage = Arc::new(SqliteReminderStorage::new(pool.clone()));
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));
    let scheduler = Arc::new(ReminderScheduler::new(storage, notifier, resolver));

    let shutdown = CancellationToken::new();
    let scan_loop = tokio::spawn(scheduler.clone().run(
        Duration::from_secs(settings.scheduler.scan_interval_secs),
        shutdown.child_token(),
    ));

    let recent_messages = Arc::new(RecentMessages::default());
    TelegramInteractionInterface::start(bot, scheduler, recent_messages).await;

    // Dispatcher returned (ctrl-c). Stop scanning, let in-flight store
    // writes finish, then close the pool.
    shutdown.cancel();
    scan_loop.await?;
    pool.close().await;

    Ok(())
}
