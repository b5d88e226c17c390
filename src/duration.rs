//! Calendar-aware elapsed time between two dates.
//!
//! Used for the "Duration" column of project, training and event tables.

use chrono::{Datelike, NaiveDate};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a duration could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// One of the inputs is not a `YYYY-MM-DD` calendar date.
    Unparseable(String),
    /// The end date precedes the start date.
    EndBeforeStart,
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationError::Unparseable(s) => write!(f, "invalid date `{}`", s),
            DurationError::EndBeforeStart => write!(f, "end date precedes start date"),
        }
    }
}

impl std::error::Error for DurationError {}

/// Whole years, months and days between two calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSpan {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl CalendarSpan {
    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

impl fmt::Display for CalendarSpan {
    /// Zero components are omitted; a zero span reads as "1 day".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("1 day");
        }

        let parts: Vec<String> = [
            (self.years, "year"),
            (self.months, "month"),
            (self.days, "day"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| plural(*n, unit))
        .collect();

        f.write_str(&parts.join(" "))
    }
}

fn plural(n: u32, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Number of days in the given month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Days in the calendar month before the one `date` falls in.
fn days_in_previous_month(date: NaiveDate) -> u32 {
    if date.month() == 1 {
        days_in_month(date.year() - 1, 12)
    } else {
        days_in_month(date.year(), date.month() - 1)
    }
}

/// Day of month a 29 February start falls on in the month of the last
/// anniversary reached by `end`.
///
/// That month is the end month once its day has passed 29 (or the end is the
/// last day of its month), otherwise the month before. Only a non-leap
/// February shortens it, to 28.
fn leap_day_anchor(end: NaiveDate) -> i32 {
    let end_month_len = days_in_month(end.year(), end.month());
    let (year, month) = if end.day() >= 29 || end.day() == end_month_len {
        (end.year(), end.month())
    } else if end.month() == 1 {
        (end.year() - 1, 12)
    } else {
        (end.year(), end.month() - 1)
    };
    days_in_month(year, month).min(29) as i32
}

/// Elementary calendar subtraction with borrowing.
///
/// Years and months are subtracted field by field, then days. A negative day
/// count borrows the length of the end date's previous month; if it is still
/// negative after borrowing it counts as zero. A 29 February start counts
/// from 28 February only when the last anniversary reached falls in a
/// February without a leap day.
pub fn calendar_span(start: NaiveDate, end: NaiveDate) -> Result<CalendarSpan, DurationError> {
    if end < start {
        return Err(DurationError::EndBeforeStart);
    }

    let start_day = if start.month() == 2 && start.day() == 29 {
        leap_day_anchor(end)
    } else {
        start.day() as i32
    };

    let mut years = end.year() - start.year();
    let mut months = end.month() as i32 - start.month() as i32;
    let mut days = end.day() as i32 - start_day;

    if days < 0 {
        days = (days + days_in_previous_month(end) as i32).max(0);
        months -= 1;
    }

    if months < 0 {
        months += 12;
        years -= 1;
    }

    Ok(CalendarSpan {
        years: years as u32,
        months: months as u32,
        days: days as u32,
    })
}

pub fn parse_date(s: &str) -> Result<NaiveDate, DurationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| DurationError::Unparseable(s.to_string()))
}

/// Parse both dates and compute the span between them.
pub fn duration_between(start: &str, end: &str) -> Result<CalendarSpan, DurationError> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    calendar_span(start, end)
}

/// Display form used by tables: empty when either date is missing or invalid.
pub fn describe_duration(start: &str, end: &str) -> String {
    if start.trim().is_empty() || end.trim().is_empty() {
        return String::new();
    }
    match duration_between(start, end) {
        Ok(span) => span.to_string(),
        Err(e) => {
            log::debug!("no duration for {} .. {}: {}", start, end, e);
            String::new()
        }
    }
}
