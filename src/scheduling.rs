use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid schedule time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Unsupported schedule frequency '{0}', expected daily or weekly")]
    UnsupportedFrequency(String),
}

/// Cadence of a recurring schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(ScheduleError::UnsupportedFrequency(other.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

/// Parse a 24h `HH:MM` time of day.
pub fn parse_time_of_day(time: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| ScheduleError::InvalidTime(time.to_string()))
}

/// Compute the next instant (UTC) at which a recurring job should fire.
///
/// - daily: today at `time`, or tomorrow if that is not after `now`
/// - weekly: the coming Sunday at `time` (a Sunday rolls a full week ahead),
///   plus another week if that is still not after `now`
///
/// The result is always strictly later than `now`.
pub fn calculate_next_run(
    frequency: &str,
    time: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let frequency: Frequency = frequency.parse()?;
    let time_of_day = parse_time_of_day(time)?;

    let mut next_run = now.date_naive().and_time(time_of_day).and_utc();

    match frequency {
        Frequency::Daily => {
            if next_run <= now {
                next_run += Duration::days(1);
            }
        }
        Frequency::Weekly => {
            let days_until_end_of_week = 7 - i64::from(now.weekday().num_days_from_sunday());
            next_run += Duration::days(days_until_end_of_week);
            if next_run <= now {
                next_run += Duration::weeks(1);
            }
        }
    }

    Ok(next_run)
}
