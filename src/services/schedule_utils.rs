use chrono::{NaiveTime, Timelike};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::schedule::DayWindow;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockParseError {
    #[error("expected HH:MM or HH:MM:SS, got {0:?}")]
    Shape(String),
    #[error("non-numeric clock component in {0:?}")]
    NotNumeric(String),
    #[error("clock value out of range: {0:?}")]
    OutOfRange(String),
}

impl From<ClockParseError> for AppError {
    fn from(error: ClockParseError) -> Self {
        AppError::validation_with_details(
            "invalid time of day",
            json!({ "error": error.to_string() }),
        )
    }
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

/// Inverse of [`minutes_from_midnight`]. Values outside one day are clamped into it.
pub fn to_naive_time(total_minutes: i64) -> NaiveTime {
    let clamped = total_minutes.clamp(0, MINUTES_PER_DAY - 1);
    let hours = (clamped / 60) as u32;
    let minutes = (clamped % 60) as u32;
    NaiveTime::from_hms_opt(hours, minutes, 0).unwrap_or(NaiveTime::MIN)
}

/// `"HH:MM"` or `"HH:MM:SS"` into minutes since midnight. Seconds are validated, then dropped.
pub fn parse_clock(value: &str) -> Result<i64, ClockParseError> {
    let trimmed = value.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(ClockParseError::Shape(trimmed.to_string()));
    }

    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(ClockParseError::NotNumeric(trimmed.to_string()));
        }
        *slot = part
            .parse()
            .map_err(|_| ClockParseError::NotNumeric(trimmed.to_string()))?;
    }

    let [hour, minute, second] = numbers;
    NaiveTime::from_hms_opt(hour, minute, second)
        .map(minutes_from_midnight)
        .ok_or_else(|| ClockParseError::OutOfRange(trimmed.to_string()))
}

pub fn parse_clock_time(value: &str) -> Result<NaiveTime, ClockParseError> {
    parse_clock(value).map(to_naive_time)
}

/// Lenient variant: malformed input reads as midnight.
pub fn parse_clock_or_midnight(value: &str) -> i64 {
    match parse_clock(value) {
        Ok(minutes) => minutes,
        Err(err) => {
            warn!(target: "app::scheduler", value, error = %err, "unparseable clock string, using 00:00");
            0
        }
    }
}

pub fn format_clock(total_minutes: i64) -> String {
    to_naive_time(total_minutes).format("%H:%M").to_string()
}

/// Resolves the working window for one run. A bound that fails to parse, or an
/// end that does not come after the start, selects `fallback` as a whole.
pub fn resolve_window(day_start: &str, day_end: &str, fallback: DayWindow) -> DayWindow {
    let parsed = parse_clock(day_start).and_then(|start| Ok((start, parse_clock(day_end)?)));

    match parsed {
        Ok((start, end)) if end > start => {
            debug!(target: "app::scheduler", start, end, "working window resolved");
            DayWindow::new(start, end)
        }
        Ok((start, end)) => {
            warn!(
                target: "app::scheduler",
                start,
                end,
                fallback_start = fallback.start,
                fallback_end = fallback.end,
                "inverted working window, using defaults"
            );
            fallback
        }
        Err(err) => {
            warn!(
                target: "app::scheduler",
                day_start,
                day_end,
                error = %err,
                "unparseable working window, using defaults"
            );
            fallback
        }
    }
}
