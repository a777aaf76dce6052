//! `--start` / `--end` resolution.
//!
//! Every query uses the half-open interval `[start, end)`. Omitted bounds
//! default to the first day of the current month at local midnight and to
//! the current moment.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone};

use crate::CliError;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// A concrete `[start, end)` export window.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> DateRange<Tz> {
    /// Inclusive lower bound in unix seconds.
    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    /// Exclusive upper bound in unix seconds.
    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }
}

/// Resolve optional start/end text against `now`.
pub fn resolve_range<Tz: TimeZone>(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Tz>,
) -> Result<DateRange<Tz>, CliError> {
    let start = match start {
        Some(text) => parse_when(text, &now)
            .ok_or_else(|| invalid_date("--start", text))?,
        None => start_of_month(&now).ok_or_else(|| {
            CliError::args("cannot determine the start of the current month")
        })?,
    };
    let end = match end {
        Some(text) => parse_when(text, &now).ok_or_else(|| invalid_date("--end", text))?,
        None => now,
    };

    if start >= end {
        return Err(CliError::args(format!(
            "--start ({}) must be before --end ({})",
            start.naive_local(),
            end.naive_local(),
        )));
    }

    Ok(DateRange { start, end })
}

fn invalid_date(flag: &str, text: &str) -> CliError {
    CliError::args(format!("invalid {} date {:?}", flag, text)).with_hint(
        "use YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS], DD/MM/YYYY, RFC 3339, \
         now, today, yesterday, or 'N days ago'",
    )
}

/// First day of `now`'s month at local midnight.
pub fn start_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let first = now.date_naive().with_day(1)?;
    local_midnight(&now.timezone(), first)
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    local_datetime(tz, date.and_hms_opt(0, 0, 0)?)
}

// Ambiguous wall-clock times (DST fall-back) take the earlier instant.
fn local_datetime<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

/// Parse a date/time expression relative to `now`. `None` if unrecognised.
pub fn parse_when<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();
    let tz = now.timezone();

    match lower.as_str() {
        "now" => return Some(now.clone()),
        "today" => return local_midnight(&tz, now.date_naive()),
        "yesterday" => return local_midnight(&tz, now.date_naive().pred_opt()?),
        _ => {}
    }

    if let Some(ago) = parse_ago(&lower) {
        return now.clone().checked_sub_signed(ago);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&tz));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return local_datetime(&tz, naive);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return local_midnight(&tz, date);
        }
    }

    None
}

/// `N day(s)|week(s)|hour(s) ago`
fn parse_ago(lower: &str) -> Option<Duration> {
    let mut parts = lower.split_whitespace();
    let count: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next()? != "ago" || parts.next().is_some() || count < 0 {
        return None;
    }
    match unit.trim_end_matches('s') {
        "hour" => Duration::try_hours(count),
        "day" => Duration::try_days(count),
        "week" => Duration::try_weeks(count),
        _ => None,
    }
}
