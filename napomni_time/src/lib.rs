use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Timelike, Utc};
use thiserror::Error;

/// Offset used when the bot interprets and displays wall-clock times.
/// Deliberately a configured constant, never the process's local timezone.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

const ABSOLUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("Unrecognized time format. Use `YYYY-MM-DD HH:MM` or `in N minutes/hours/days`.")]
    BadFormat,
    #[error("That time has already passed.")]
    PastTime,
}

/// Resolution result: the absolute UTC instant plus the string shown back
/// to the user. `display` is re-derivable from `due_at` alone, see
/// [`TimeResolver::display`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTime {
    pub due_at: DateTime<Utc>,
    pub display: String,
}

/// Converts user-supplied time expressions into absolute UTC instants.
///
/// Two grammars, tried in order:
/// - absolute `YYYY-MM-DD HH:MM`, read as wall-clock time in the reference
///   offset;
/// - relative `in <amount> <unit>` with `unit` matched by prefix against
///   `minute`/`hour`/`day`. Unknown units fall back to minutes.
#[derive(Debug, Clone, Copy)]
pub struct TimeResolver {
    offset: FixedOffset,
}

impl TimeResolver {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn resolve(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedTime, TimeParseError> {
        let raw = raw.trim();
        let now = truncate_to_second(now);

        let due_at = if has_absolute_shape(raw) {
            self.resolve_absolute(raw, now)?
        } else if let Some(rest) = raw.strip_prefix("in ") {
            resolve_relative(rest, now)?
        } else {
            return Err(TimeParseError::BadFormat);
        };

        Ok(ResolvedTime {
            due_at,
            display: self.display(due_at),
        })
    }

    /// Renders an instant as wall-clock time in the reference offset.
    /// Deterministic re-display for confirmations and listings.
    pub fn display(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(ABSOLUTE_FORMAT)
            .to_string()
    }

    fn resolve_absolute(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TimeParseError> {
        // parse_from_str validates calendar ranges; out-of-range fields must
        // reject rather than roll over.
        let wall_clock = NaiveDateTime::parse_from_str(raw, ABSOLUTE_FORMAT)
            .map_err(|_| TimeParseError::BadFormat)?;

        let due_at = wall_clock
            .and_local_timezone(self.offset)
            .single()
            .ok_or(TimeParseError::BadFormat)?
            .with_timezone(&Utc);

        if due_at <= now {
            return Err(TimeParseError::PastTime);
        }

        Ok(due_at)
    }
}

fn resolve_relative(rest: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeParseError> {
    let mut parts = rest.split_whitespace();
    let amount = parts.next().ok_or(TimeParseError::BadFormat)?;
    let unit = parts.next().ok_or(TimeParseError::BadFormat)?;

    let amount: i64 = amount.parse().map_err(|_| TimeParseError::BadFormat)?;
    if amount <= 0 {
        return Err(TimeParseError::PastTime);
    }

    let unit = unit.to_lowercase();
    let delta = if unit.starts_with("hour") {
        TimeDelta::try_hours(amount)
    } else if unit.starts_with("day") {
        TimeDelta::try_days(amount)
    } else {
        // "minute" and every unknown unit; the fallback matches the
        // documented behavior of the original bot.
        TimeDelta::try_minutes(amount)
    };

    let due_at = delta
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(TimeParseError::BadFormat)?;

    if due_at <= now {
        return Err(TimeParseError::PastTime);
    }

    Ok(due_at)
}

/// Strict `YYYY-MM-DD HH:MM` shape check. Chrono alone would also accept
/// single-digit fields.
fn has_absolute_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 16 {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        13 => *b == b':',
        _ => b.is_ascii_digit(),
    })
}

fn truncate_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_nanosecond(0)
        .expect("zeroing nanoseconds never fails")
}
