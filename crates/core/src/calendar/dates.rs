use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};

/// Midnight UTC on the first day of `at`'s month.
pub fn month_start(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let first = NaiveDate::from_ymd_opt(at.year(), at.month(), 1)?;
    midnight(first)
}

/// Next payment date for a debt due on `due_day` of every month.
///
/// Takes `due_day` in the current month; if that midnight is already behind `now`, the same day
/// next month. Days past the end of a short month land on its last day. Returns `None` for a
/// `due_day` outside 1..=31.
pub fn next_monthly_due(due_day: i32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let day = u32::try_from(due_day).ok().filter(|d| (1..=31).contains(d))?;

    let this_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    let candidate = midnight(clamped_day(this_month, day)?)?;
    if candidate >= now {
        return Some(candidate);
    }

    let next_month = this_month.checked_add_months(Months::new(1))?;
    midnight(clamped_day(next_month, day)?)
}

fn clamped_day(first_of_month: NaiveDate, day: u32) -> Option<NaiveDate> {
    let last = first_of_month
        .checked_add_months(Months::new(1))?
        .pred_opt()?
        .day();
    first_of_month.with_day(day.min(last))
}

fn midnight(d: NaiveDate) -> Option<DateTime<Utc>> {
    Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?))
}
