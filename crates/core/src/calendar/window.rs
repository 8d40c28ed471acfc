use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::fmt;

const DEFAULT_MAX_WINDOW_DAYS: i64 = 366 * 3;
const MAX_WINDOW_DAYS_CEILING: i64 = 366 * 100;

/// Closed interval `[start, end]` every emitted event must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Parses the `startDate`/`endDate` query pair. Both are required, and the span may not exceed
    /// `MAX_WINDOW_DAYS` (default three years).
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, WindowError> {
        Self::parse_with_max_days(start, end, max_window_days())
    }

    pub fn parse_with_max_days(
        start: Option<&str>,
        end: Option<&str>,
        max_days: i64,
    ) -> Result<Self, WindowError> {
        let (Some(start), Some(end)) = (non_blank(start), non_blank(end)) else {
            return Err(WindowError::Missing);
        };

        let start = parse_bound(start).ok_or_else(|| WindowError::Invalid {
            field: "startDate",
            value: start.to_string(),
        })?;
        let end = parse_bound(end).ok_or_else(|| WindowError::Invalid {
            field: "endDate",
            value: end.to_string(),
        })?;

        let span = end.signed_duration_since(start);
        if Duration::try_days(max_days).is_some_and(|max| span > max) {
            return Err(WindowError::TooWide { max_days });
        }

        Ok(Self { start, end })
    }
}

fn max_window_days() -> i64 {
    std::env::var("MAX_WINDOW_DAYS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_WINDOW_DAYS)
        .min(MAX_WINDOW_DAYS_CEILING)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    Missing,
    Invalid { field: &'static str, value: String },
    TooWide { max_days: i64 },
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::Missing => f.write_str("startDate and endDate are required"),
            WindowError::Invalid { field, value } => {
                write!(f, "{field} is not a valid date: {value:?}")
            }
            WindowError::TooWide { max_days } => {
                write!(f, "date range may span at most {max_days} days")
            }
        }
    }
}

impl std::error::Error for WindowError {}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates (midnight UTC) and epoch milliseconds.
pub fn parse_bound(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    let millis = s.parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_supported_bound_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_bound("2024-03-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_bound("2024-03-01T09:00:00+09:00"), Some(expected));
        assert_eq!(parse_bound("2024-03-01"), Some(expected));
        assert_eq!(parse_bound("1709251200000"), Some(expected));
        assert_eq!(parse_bound("next tuesday"), None);
    }

    #[test]
    fn missing_bounds_are_rejected() {
        assert_eq!(
            CalendarWindow::parse(Some("2024-03-01"), None),
            Err(WindowError::Missing)
        );
        assert_eq!(
            CalendarWindow::parse(Some("  "), Some("2024-03-31")),
            Err(WindowError::Missing)
        );
    }

    #[test]
    fn invalid_bound_names_the_field() {
        let err = CalendarWindow::parse(Some("2024-03-01"), Some("soon")).unwrap_err();
        assert_eq!(
            err,
            WindowError::Invalid {
                field: "endDate",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn oversized_window_is_rejected() {
        let err = CalendarWindow::parse_with_max_days(Some("0"), Some("8210266876799999"), 1098)
            .unwrap_err();
        assert_eq!(err, WindowError::TooWide { max_days: 1098 });
        assert_eq!(err.to_string(), "date range may span at most 1098 days");
    }

    #[test]
    fn window_at_max_span_is_accepted() {
        let w = CalendarWindow::parse_with_max_days(Some("2024-01-01"), Some("2024-01-31"), 30)
            .unwrap();
        assert_eq!(w.end - w.start, Duration::days(30));
        assert!(
            CalendarWindow::parse_with_max_days(Some("2024-01-01"), Some("2024-02-01"), 30)
                .is_err()
        );
    }

    #[test]
    fn window_is_closed_on_both_ends() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap();
        let w = CalendarWindow::new(start, end);
        assert!(w.contains(start));
        assert!(w.contains(end));
        assert!(!w.contains(end + chrono::Duration::seconds(1)));
    }
}
