//! Clock time within a single day.
//!
//! # Responsibility
//! - Parse and format `HH:MM` clock times.
//! - Provide minute arithmetic used by overlap, progress and timeline math.
//!
//! # Invariants
//! - `hour` is always in `0..=23` and `minute` in `0..=59`.
//! - Ordering is by minutes since midnight.
//! - Wire form is zero-padded `HH:MM`, so string order matches value order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static TIME_24H_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})$").expect("valid time regex"));

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Error returned when clock text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormatError {
    /// Text is not two numeric fields separated by a colon.
    Malformed(String),
    /// Hour outside `0..=23`.
    HourOutOfRange(u32),
    /// Minute outside `0..=59`.
    MinuteOutOfRange(u32),
}

impl Display for TimeFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(text) => write!(f, "invalid time `{text}`; expected HH:MM"),
            Self::HourOutOfRange(hour) => write!(f, "hour {hour} is outside 0..=23"),
            Self::MinuteOutOfRange(minute) => write!(f, "minute {minute} is outside 0..=59"),
        }
    }
}

impl Error for TimeFormatError {}

/// Immutable hour/minute value with no date or timezone attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    // Field order matters: derived `Ord` compares hour first, then minute.
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Midnight, `00:00`.
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };
    /// Last representable minute, `23:59`.
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay {
        hour: 23,
        minute: 59,
    };

    /// Creates a time from hour/minute components.
    ///
    /// # Errors
    /// - `HourOutOfRange` / `MinuteOutOfRange` for out-of-range components.
    pub fn new(hour: u32, minute: u32) -> Result<Self, TimeFormatError> {
        if hour > 23 {
            return Err(TimeFormatError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(TimeFormatError::MinuteOutOfRange(minute));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Parses 24-hour `HH:MM` text. Surrounding whitespace is ignored.
    ///
    /// The hour may have one or two digits, the minute must have two.
    pub fn parse(text: &str) -> Result<Self, TimeFormatError> {
        let trimmed = text.trim();
        let captures = TIME_24H_RE
            .captures(trimmed)
            .ok_or_else(|| TimeFormatError::Malformed(trimmed.to_string()))?;

        let hour = captures[1]
            .parse::<u32>()
            .map_err(|_| TimeFormatError::Malformed(trimmed.to_string()))?;
        let minute = captures[2]
            .parse::<u32>()
            .map_err(|_| TimeFormatError::Malformed(trimmed.to_string()))?;

        Self::new(hour, minute)
    }

    /// Builds a time from minutes since midnight.
    ///
    /// Returns `None` when `minutes` is not within one day.
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Returns `hour * 60 + minute`.
    pub fn minutes_since_midnight(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    /// Renders zero-padded `HH:MM`.
    pub fn format_24h(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// Renders `H:MM AM/PM`; hours 0 and 12 both render as `12`.
    pub fn format_12h(&self) -> String {
        let suffix = if self.hour >= 12 { "PM" } else { "AM" };
        let display_hour = match self.hour % 12 {
            0 => 12,
            other => other,
        };
        format!("{display_hour}:{:02} {suffix}", self.minute)
    }

    /// Adds minutes, saturating at `23:59`.
    pub fn saturating_add_minutes(&self, minutes: u16) -> Self {
        let total = self
            .minutes_since_midnight()
            .saturating_add(minutes)
            .min(MINUTES_PER_DAY - 1);
        Self::from_minutes(total).unwrap_or(Self::LAST_MINUTE)
    }

    /// Converts into a chrono wall-clock time at second zero.
    pub fn to_naive_time(&self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(chrono::NaiveTime::MIN)
    }

    /// Truncates a chrono wall-clock time to minute precision.
    pub fn from_naive_time(time: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.format_24h()
    }
}

/// Twelve-hour label for a whole hour, as used by the day timeline (`12 AM`, `1 PM`).
pub fn hour_label(hour: u8) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{hour} AM"),
        12 => "12 PM".to_string(),
        other => format!("{} PM", other.saturating_sub(12)),
    }
}
