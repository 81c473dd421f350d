//! Shared helpers for parsing provider text fields.
//!
//! All parsing is culture-invariant: `.` is the only decimal separator and
//! thousands separators are rejected. Two failure styles exist because the
//! fields have different contracts:
//!
//! - dates, durations and percentages are hard errors when malformed
//!   (`AppError::InvalidData`), since a record without them is meaningless;
//! - times of day return `None`, since the provider legitimately omits events
//!   (polar days, moonless nights).

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use crate::errors::AppError;

/// Parse a `yyyy-MM-dd` calendar date.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    let s = value.trim();
    if s.is_empty() {
        return Err(AppError::InvalidData("date is missing".to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::InvalidData(format!("invalid date '{}': {}", value, e)))
}

/// Parse a duration written as `H:mm[:ss[.fff]]`.
///
/// Blank input means "not reported" and yields zero, matching what the provider
/// sends for days without a measurable length.
pub(crate) fn parse_duration(value: &str) -> Result<TimeDelta, AppError> {
    let s = value.trim();
    if s.is_empty() {
        return Ok(TimeDelta::zero());
    }

    let invalid = || AppError::InvalidData(format!("invalid duration '{}'", value));

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 || parts[0].len() > 3 {
        return Err(invalid());
    }

    let hours = parse_digits(parts[0]).ok_or_else(invalid)?;
    let minutes = parse_two_digits(parts[1]).ok_or_else(invalid)?;
    if minutes >= 60 {
        return Err(invalid());
    }

    let (seconds, nanos) = match parts.get(2) {
        Some(sec_part) => parse_seconds(sec_part).ok_or_else(invalid)?,
        None => (0, 0),
    };

    let total = TimeDelta::hours(hours)
        + TimeDelta::minutes(minutes)
        + TimeDelta::seconds(seconds)
        + TimeDelta::nanoseconds(nanos);
    Ok(total)
}

/// Parse a clock reading such as `09:10:58.985` into a time of day.
///
/// Uses the duration grammar so fractional seconds are accepted; values of
/// 24 hours or more are rejected.
pub(crate) fn parse_clock_time(value: &str) -> Result<NaiveTime, AppError> {
    let delta = parse_duration(value)?;
    let secs = delta.num_seconds();
    let nanos = delta.subsec_nanos();
    u32::try_from(secs)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos as u32))
        .ok_or_else(|| AppError::InvalidData(format!("time of day out of range '{}'", value)))
}

/// Parse a time of day written as `H:mm` or `H:mm:ss`.
///
/// Returns `None` for blank, placeholder (`-:-`) or otherwise malformed text.
pub(crate) fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Parse a percentage such as `"12.5%"` or `"-40.12"` into a float.
///
/// Blank input yields `0.0`. Non-finite values are rejected.
pub(crate) fn parse_percentage(value: &str) -> Result<f64, AppError> {
    let s = value.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    let number = s.replace('%', "");
    let number = number.trim();

    let only_numeric = number
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+');
    if !only_numeric {
        return Err(AppError::InvalidData(format!(
            "invalid percentage '{}'",
            value
        )));
    }

    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::InvalidData(format!("invalid percentage '{}'", value)))
}

/// Format a duration as `HH:MM:SS` (sign-prefixed when negative).
pub(crate) fn format_duration(d: TimeDelta) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_two_digits(s: &str) -> Option<i64> {
    if s.len() != 2 {
        return None;
    }
    parse_digits(s)
}

/// `ss` or `ss.f…` (up to nanosecond precision).
fn parse_seconds(s: &str) -> Option<(i64, i64)> {
    let (whole, fraction) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    let seconds = parse_two_digits(whole)?;
    if seconds >= 60 {
        return None;
    }
    let nanos = match fraction {
        None => 0,
        Some(f) if f.is_empty() || f.len() > 9 => return None,
        Some(f) => parse_digits(f)? * 10_i64.pow(9 - f.len() as u32),
    };
    Some((seconds, nanos))
}
