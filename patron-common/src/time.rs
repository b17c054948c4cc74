//! Timestamp utilities

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a platform timestamp
///
/// Accepts RFC 3339 (`2024-03-01T12:00:00.000+00:00`, `...Z`) and bare
/// dates (`2024-03-01`, taken as midnight UTC). Returns `None` for anything
/// else, including empty strings.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('T') {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole calendar months elapsed from `start` to `end`, floor-rounded
///
/// The result is the largest `n` for which `start + n months` (day clamped
/// to the end of the target month) is not after `end`. Returns 0 when
/// `start` is after `end`.
pub fn whole_months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    if start >= end {
        return 0;
    }

    let year_diff = i64::from(end.year()) - i64::from(start.year());
    let month_diff = i64::from(end.month()) - i64::from(start.month());
    let estimate = (year_diff * 12 + month_diff).max(0);
    let mut months = u32::try_from(estimate).unwrap_or(u32::MAX);

    // Estimate is at most one too high; walk back while the anniversary is still ahead
    while months > 0 {
        match start.checked_add_months(Months::new(months)) {
            Some(anniversary) if anniversary <= end => break,
            _ => months -= 1,
        }
    }

    months
}
