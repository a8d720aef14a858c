//! Pure reminder-moment matching.
//!
//! A user's reminder moment is a local wall-clock minute in their own IANA
//! timezone. Matching converts the current UTC instant into that zone and
//! compares hour and minute. Nothing here remembers prior ticks.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use solvelog_types::ReminderSetting;

/// Validation failure for a stored or submitted reminder configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReminderConfigError {
    #[error("invalid reminder time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),
}

/// Parse a `"HH:MM"` wall-clock time (24h, minute resolution).
pub fn parse_reminder_time(s: &str) -> Result<(u32, u32), ReminderConfigError> {
    let invalid = || ReminderConfigError::InvalidTime(s.to_string());

    let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// Resolve an IANA timezone name against the compiled database.
pub fn parse_timezone(s: &str) -> Result<Tz, ReminderConfigError> {
    s.parse::<Tz>()
        .map_err(|_| ReminderConfigError::InvalidTimezone(s.to_string()))
}

/// Whether `now` falls inside the reminder minute `(hour, minute)` in `tz`.
pub fn matches(now: DateTime<Utc>, hour: u32, minute: u32, tz: Tz) -> bool {
    let local = now.with_timezone(&tz);
    local.hour() == hour && local.minute() == minute
}

/// Evaluate a stored setting against `now`.
///
/// The raw strings are validated here, per tick, so a malformed row surfaces
/// as an error the scheduler can isolate to that one user.
pub fn evaluate(now: DateTime<Utc>, setting: &ReminderSetting) -> Result<bool, ReminderConfigError> {
    let (hour, minute) = parse_reminder_time(&setting.time)?;
    let tz = parse_timezone(&setting.timezone)?;
    Ok(matches(now, hour, minute, tz))
}
