use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::fmt;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Days shown on either side of today in the attendance picker.
pub const ATTENDANCE_WINDOW_DAYS: i64 = 7;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    Malformed(String),
    DayOutOfRange(u8),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::Malformed(value) => {
                write!(f, "invalid clock time '{value}' (expected zero-padded HH:MM)")
            }
            ClockError::DayOutOfRange(day) => {
                write!(f, "day index {day} is out of range (expected 0-6)")
            }
        }
    }
}

impl std::error::Error for ClockError {}

/// Parse a zero-padded 24-hour "HH:MM" string into minutes since midnight.
///
/// Only the strict five-character form is accepted, because same-day ordering
/// compares the raw strings.
pub fn parse_clock(value: &str) -> Result<u32, ClockError> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(ClockError::Malformed(value.to_string()));
    }
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ClockError::Malformed(value.to_string()))?;
    Ok(minute_of_day(time))
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Sunday-based day index (Sunday = 0 .. Saturday = 6).
pub fn day_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Day index and minute-of-day for a local timestamp.
pub fn clock_position(now: NaiveDateTime) -> (u8, u32) {
    (day_index(now.weekday()), minute_of_day(now.time()))
}

pub fn day_name(day: u8) -> Result<&'static str, ClockError> {
    DAY_NAMES
        .get(day as usize)
        .copied()
        .ok_or(ClockError::DayOutOfRange(day))
}

/// Render "HH:MM" as a 12-hour clock string, e.g. "13:05" -> "1:05 PM".
pub fn format_12h(value: &str) -> Result<String, ClockError> {
    let minutes = parse_clock(value)?;
    let hour = minutes / 60;
    let minute = minutes % 60;
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    Ok(format!("{hour12}:{minute:02} {suffix}"))
}

/// Time-of-day greeting used on the dashboard header.
pub fn greeting(hour: u32, name: &str) -> String {
    let part = if hour < 12 {
        "morning"
    } else if hour < 18 {
        "afternoon"
    } else {
        "evening"
    };
    format!("Good {part}, {name}!")
}

/// All dates from `today - 7` to `today + 7` inclusive.
pub fn attendance_window(today: NaiveDate) -> Vec<NaiveDate> {
    let start = today - Duration::days(ATTENDANCE_WINDOW_DAYS);
    let end = today + Duration::days(ATTENDANCE_WINDOW_DAYS);
    days_in_range(start, end)
}

pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;

    while current <= end {
        days.push(current);
        current += Duration::days(1);
    }
    days
}
