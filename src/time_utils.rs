//! Deterministic timezone-aware datetime parsing, formatting, and arithmetic.
//!
//! Everything here is pure and non-blocking: the configured timezone is passed
//! in by value and there is no shared mutable state, so these functions are
//! safe to call from any number of concurrent query pipelines.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Classified time-library error — parse failures are recoverable via
/// [`safe_parse`]; unsupported units are surfaced to the model as tool
/// observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    Parse(String),
    UnsupportedUnit(String),
}

impl TimeError {
    fn parse(msg: impl Into<String>) -> Self {
        TimeError::Parse(msg.into())
    }
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::Parse(msg) => write!(f, "could not parse time: {}", msg),
            TimeError::UnsupportedUnit(unit) => write!(
                f,
                "Unsupported unit '{}'. Supported units are: seconds, minutes, hours, days, weeks, years.",
                unit
            ),
        }
    }
}

impl std::error::Error for TimeError {}

/// Snapshot of the current instant in the configured timezone.
#[derive(Debug, Clone)]
pub struct CurrentInfo {
    pub iso: String,
    pub weekday: String,
    pub date: String,
    pub time: String,
    pub tz_abbrev: String,
}

/// Current time in the configured timezone.
pub fn current_time(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Time one hour ago in the configured timezone.
pub fn one_hour_ago(tz: Tz) -> DateTime<Tz> {
    current_time(tz) - Duration::hours(1)
}

/// ISO-8601 string with microsecond precision, e.g.
/// `2025-11-04T11:57:20.161562-05:00`.
pub fn iso_micro<Z: TimeZone>(dt: &DateTime<Z>) -> String
where
    Z::Offset: fmt::Display,
{
    dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
}

/// Current instant plus weekday/date/time/timezone breakdown.
pub fn current_info(tz: Tz) -> CurrentInfo {
    let now = current_time(tz);
    CurrentInfo {
        iso: iso_micro(&now),
        weekday: now.format("%A").to_string(),
        date: now.format("%Y-%m-%d").to_string(),
        time: now.format("%H:%M:%S").to_string(),
        tz_abbrev: now.format("%Z").to_string(),
    }
}

/// Parse an ISO-8601 time string and convert it to the configured timezone.
///
/// Tolerated input shapes:
/// - a trailing `Z` (treated as a `+00:00` offset),
/// - a naive string without offset (assumed to already be in `tz`),
/// - a date-only string (midnight in `tz`),
/// - an annotated string containing `": "` — only the substring after the
///   last `": "` is parsed (tool observations re-enter the loop annotated,
///   e.g. `"Current time: 2025-11-04T11:57:20.161562-05:00"`).
pub fn parse_to_timezone(time_str: &str, tz: Tz) -> Result<DateTime<Tz>, TimeError> {
    let mut s = time_str.trim();
    if let Some(idx) = s.rfind(": ") {
        s = s[idx + 2..].trim();
    }

    let normalized;
    if let Some(stripped) = s.strip_suffix('Z') {
        normalized = format!("{}+00:00", stripped);
        s = &normalized;
    }

    // Offset-carrying forms first.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&tz));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&tz));
        }
    }

    // Naive forms: interpret in the configured timezone.
    let naive = parse_naive(s)
        .ok_or_else(|| TimeError::parse(format!("'{}' is not a valid ISO 8601 timestamp", s)))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TimeError::parse(format!("'{}' does not exist in timezone {}", s, tz)))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format for user-friendly display: `YYYY-MM-DD HH:MM:SS[.ffffff] TZABBR`,
/// with trailing zero fraction digits (and a bare trailing `.`) stripped.
pub fn format_for_display(dt: &DateTime<Tz>, include_microseconds: bool) -> String {
    let base = dt.format("%Y-%m-%d %H:%M:%S").to_string();
    let abbrev = dt.format("%Z").to_string();
    if include_microseconds {
        let frac = format!("{:06}", dt.nanosecond() / 1_000);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            format!("{} {}", base, abbrev)
        } else {
            format!("{}.{} {}", base, frac, abbrev)
        }
    } else {
        format!("{} {}", base, abbrev)
    }
}

/// Add `amount` of `unit` to `dt`. Units are case-insensitive; year
/// arithmetic shifts the calendar year component and clamps Feb 29 to
/// Feb 28 when the target year is not a leap year.
pub fn add_delta(dt: DateTime<Tz>, amount: i64, unit: &str) -> Result<DateTime<Tz>, TimeError> {
    let delta = match unit.to_lowercase().as_str() {
        "seconds" => Duration::seconds(amount),
        "minutes" => Duration::minutes(amount),
        "hours" => Duration::hours(amount),
        "days" => Duration::days(amount),
        "weeks" => Duration::weeks(amount),
        "year" | "years" => {
            let target = dt.year() + amount as i32;
            return dt
                .with_year(target)
                .or_else(|| dt.with_day(28).and_then(|d| d.with_year(target)))
                .ok_or_else(|| {
                    TimeError::parse(format!("cannot shift {} to year {}", dt, target))
                });
        }
        other => return Err(TimeError::UnsupportedUnit(other.to_string())),
    };
    Ok(dt + delta)
}

/// Subtract `amount` of `unit` from `dt` — addition with the sign inverted.
pub fn subtract_delta(dt: DateTime<Tz>, amount: i64, unit: &str) -> Result<DateTime<Tz>, TimeError> {
    add_delta(dt, -amount, unit)
}

/// Weekday name for the date portion of `date_str`.
pub fn check_weekday(date_str: &str, tz: Tz) -> Result<String, TimeError> {
    if date_str.trim().is_empty() {
        return Err(TimeError::parse("date_str is required and cannot be empty"));
    }
    let dt = parse_to_timezone(date_str, tz)?;
    Ok(dt.format("%A").to_string())
}

/// Parse `time_str` if present and valid, otherwise fall back to
/// `default_time`. Never fails.
pub fn safe_parse(time_str: Option<&str>, default_time: DateTime<Tz>, tz: Tz) -> DateTime<Tz> {
    match time_str {
        Some(s) if !s.trim().is_empty() => parse_to_timezone(s, tz).unwrap_or(default_time),
        _ => default_time,
    }
}
