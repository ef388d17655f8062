use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Serialize, Serializer};

use crate::error::TimeParseError;

const HOURS_PER_DAY: u32 = 24;
const MINUTES_PER_HOUR: u32 = 60;
const SECONDS_PER_DAY: i64 = 86_400;

/// Minute-resolution wall-clock time, always normalized to `00:00..=23:59`.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
}

impl TimeOfDay {
    pub const fn new(hours: u32, minutes: u32) -> Self {
        Self {
            hours: (hours % HOURS_PER_DAY) as u8,
            minutes: (minutes % MINUTES_PER_HOUR) as u8,
        }
    }

    pub const fn hours(self) -> u32 {
        self.hours as u32
    }

    pub const fn minutes(self) -> u32 {
        self.minutes as u32
    }

    /// Truncates seconds and below.
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self::new(time.hour(), time.minute())
    }

    pub fn increment_hours(self) -> Self {
        Self::new(self.hours() + 1, self.minutes())
    }

    pub fn decrement_hours(self) -> Self {
        Self::new(self.hours() + HOURS_PER_DAY - 1, self.minutes())
    }

    pub fn increment_minutes(self) -> Self {
        Self::new(self.hours(), self.minutes() + 1)
    }

    pub fn decrement_minutes(self) -> Self {
        Self::new(self.hours(), self.minutes() + MINUTES_PER_HOUR - 1)
    }

    /// Parses `HH:MM` without ever failing: a field that does not parse
    /// becomes `00` and out-of-range values wrap.
    pub fn parse_lenient(input: &str) -> Self {
        let mut parts = input.trim().splitn(2, ':');
        let hours = parse_field(parts.next());
        let minutes = parse_field(parts.next());
        Self::new(hours, minutes)
    }

    /// Seconds from `now` until this time next matches. Zero while `now` is
    /// inside the match window.
    pub fn seconds_until(self, now: NaiveTime) -> i64 {
        if Self::from_time(&now) == self {
            return 0;
        }
        let target = i64::from(self.hours() * 3_600 + self.minutes() * 60);
        let current = i64::from(now.num_seconds_from_midnight());
        (target - current).rem_euclid(SECONDS_PER_DAY)
    }
}

fn parse_field(field: Option<&str>) -> u32 {
    field
        .map(str::trim)
        .and_then(|text| text.parse::<u32>().ok())
        .unwrap_or(0)
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(input.trim(), "%H:%M")
            .map_err(|_| TimeParseError::new(input))?;
        Ok(Self::from_time(&time))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
