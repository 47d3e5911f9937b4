use std::sync::Arc;

use napomni_models::chrono::{DateTime, TimeDelta, Utc};
use napomni_models::reminder::ChatId;
use napomni_scheduler::{ActiveReminder, CreateReminderError, ReminderScheduler};
use napomni_time::TimeResolver;
use teloxide::macros::BotCommands;
use teloxide::prelude::*;

use crate::{HandlerResult, RecentMessages};

const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HELP_TEXT: &str = "🤖 Reminder bot

Commands:
/remind <text> at <time> - create a reminder
/debug - list your reminders
/clear - delete all your reminders
/time - show the current time

Examples:
/remind Call mom at 2030-12-31 20:00
/remind Team meeting at in 2 hours
/remind Take the pills at in 2 minutes

💡 Absolute times use the YYYY-MM-DD HH:MM format.";

const REMIND_USAGE: &str = "Usage: /remind <text> at <time>
Example: /remind Call mom at in 2 hours";

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub(crate) enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "create a reminder: /remind <text> at <time>")]
    Remind(String),
    #[command(description = "list your reminders")]
    Debug,
    #[command(description = "delete all your reminders")]
    Clear,
    #[command(description = "show the current time")]
    Time,
}

pub(crate) async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    scheduler: Arc<ReminderScheduler>,
    recent_messages: Arc<RecentMessages>,
) -> HandlerResult {
    if !recent_messages.first_seen(msg.chat.id.0, msg.id.0) {
        log::debug!(
            "Dropping duplicate message {} in chat {}",
            msg.id.0,
            msg.chat.id
        );
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    let now = Utc::now();

    let reply = match cmd {
        Command::Start => HELP_TEXT.to_owned(),
        Command::Remind(args) => create_reminder(&scheduler, chat_id, &args, now).await,
        Command::Debug => match scheduler.list_active(chat_id, now).await {
            Ok(reminders) => render_reminder_list(scheduler.resolver(), now, &reminders),
            Err(err) => {
                log::error!("Failed to list reminders for chat {chat_id}: {err:#}");
                "❌ Failed to load your reminders, please try again.".to_owned()
            }
        },
        Command::Clear => match scheduler.clear_all(chat_id).await {
            Ok(removed) => format!("🗑 Removed {removed} reminder(s)"),
            Err(err) => {
                log::error!("Failed to clear reminders for chat {chat_id}: {err:#}");
                "❌ Failed to clear your reminders, please try again.".to_owned()
            }
        },
        Command::Time => render_current_time(scheduler.resolver(), now),
    };

    bot.send_message(msg.chat.id, reply).await?;

    Ok(())
}

async fn create_reminder(
    scheduler: &ReminderScheduler,
    chat_id: ChatId,
    args: &str,
    now: DateTime<Utc>,
) -> String {
    let Some((text, raw_time)) = parse_remind_args(args) else {
        return REMIND_USAGE.to_owned();
    };

    match scheduler.create(chat_id, text.to_owned(), raw_time, now).await {
        Ok(created) => format!(
            "✅ Reminder created:\n\"{}\"\n⏰ at {}",
            created.reminder.text, created.display
        ),
        Err(CreateReminderError::Rejected(reason)) => format!("❌ {reason}"),
        Err(CreateReminderError::Store(err)) => {
            log::error!("Failed to store reminder for chat {chat_id}: {err:#}");
            "❌ Failed to save the reminder, please try again.".to_owned()
        }
    }
}

/// Splits `/remind` arguments on the last ` at `, so reminder text may
/// itself contain the word.
fn parse_remind_args(args: &str) -> Option<(&str, &str)> {
    let (text, raw_time) = args.rsplit_once(" at ")?;
    let text = text.trim();
    let raw_time = raw_time.trim();

    if text.is_empty() || raw_time.is_empty() {
        return None;
    }

    Some((text, raw_time))
}

fn render_current_time(resolver: &TimeResolver, now: DateTime<Utc>) -> String {
    format!(
        "🕒 Current time:\n📍 {} (UTC{})\n🌐 {} UTC",
        resolver.display(now),
        resolver.offset(),
        now.format(UTC_FORMAT)
    )
}

fn render_reminder_list(
    resolver: &TimeResolver,
    now: DateTime<Utc>,
    reminders: &[ActiveReminder],
) -> String {
    let mut message = format!(
        "🕒 Current time: {}\n🌐 Current UTC: {}\n\n",
        resolver.display(now),
        now.format(UTC_FORMAT)
    );

    if reminders.is_empty() {
        message.push_str("📭 No reminders");
        return message;
    }

    message.push_str(&format!("📋 All reminders ({}):\n\n", reminders.len()));

    for item in reminders {
        let status = if item.reminder.sent {
            "✅ sent"
        } else {
            "⏳ pending"
        };
        let time_left = if item.remaining > TimeDelta::zero() {
            let minutes = (item.remaining.num_seconds() + 30) / 60;
            format!("in {minutes} min")
        } else {
            "DUE NOW".to_owned()
        };

        message.push_str(&format!(
            "📍 \"{}\"\n⏰ {} (UTC{})\n🌐 {} UTC\n🕒 {time_left} | {status}\n🆔 ID: {}\n\n",
            item.reminder.text,
            item.display,
            resolver.offset(),
            item.reminder.due_at.format(UTC_FORMAT),
            item.reminder.id
        ));
    }

    message
}
