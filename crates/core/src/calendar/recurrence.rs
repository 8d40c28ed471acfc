use crate::calendar::window::CalendarWindow;
use crate::domain::records::Frequency;
use chrono::{DateTime, Duration, Months, Utc};

/// Upper bound on occurrences emitted for one template in one window.
pub const MAX_OCCURRENCES: usize = 5_000;

/// The `n`-th occurrence after `anchor` (the anchor itself is `n == 0`).
///
/// Month and year steps are computed from the anchor rather than the previous occurrence, so a
/// template anchored on the 31st returns to the 31st after passing through shorter months.
pub fn nth_occurrence(anchor: DateTime<Utc>, frequency: Frequency, n: u32) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::Daily => anchor.checked_add_signed(Duration::days(i64::from(n))),
        Frequency::Weekly => anchor.checked_add_signed(Duration::days(7 * i64::from(n))),
        Frequency::Monthly => anchor.checked_add_months(Months::new(n)),
        Frequency::Yearly => anchor.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Occurrence dates of a template inside `window`.
///
/// Walks from `start_date` until the cursor passes the window end. When `end_date` is set,
/// stepping past it also stops the walk; the occurrence emitted just before is kept. At most
/// [`MAX_OCCURRENCES`] dates are returned.
pub fn expand(
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    frequency: Frequency,
    window: CalendarWindow,
) -> Vec<DateTime<Utc>> {
    expand_capped(start_date, end_date, frequency, window, MAX_OCCURRENCES)
}

fn expand_capped(
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    frequency: Frequency,
    window: CalendarWindow,
    cap: usize,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut n: u32 = 0;
    let mut cursor = start_date;

    loop {
        if cursor > window.end {
            break;
        }
        if cursor >= window.start {
            if out.len() >= cap {
                tracing::warn!(%start_date, %frequency, cap, "recurrence expansion truncated");
                break;
            }
            out.push(cursor);
        }

        let Some(next_n) = n.checked_add(1) else {
            break;
        };
        n = next_n;
        let Some(next) = nth_occurrence(start_date, frequency, n) else {
            break;
        };
        cursor = next;

        if end_date.is_some_and(|end_date| cursor > end_date) {
            break;
        }
    }

    out
}
