//! Merges a user's records into one time-ordered list of calendar events.

pub mod dates;
pub mod recurrence;
pub mod window;

pub use window::{CalendarWindow, WindowError};

use crate::clock::Clock;
use crate::domain::event::{CalendarEvent, EventColor, EventDetails};
use crate::domain::records::{
    Bill, Budget, Debt, Frequency, Goal, RecurringTransaction, Transaction, UserSnapshot,
};
use crate::source::UserDataSource;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fetches the user's records and aggregates them over `window`.
pub async fn build_calendar(
    source: &dyn UserDataSource,
    clock: &dyn Clock,
    user_id: Uuid,
    window: CalendarWindow,
) -> anyhow::Result<Vec<CalendarEvent>> {
    let data = source.snapshot(user_id).await?;
    let events = aggregate(&data, window, clock.now());

    tracing::debug!(
        %user_id,
        start = %window.start,
        end = %window.end,
        events = events.len(),
        "calendar built"
    );

    Ok(events)
}

/// Pure part of [`build_calendar`]. `now` only affects debt due dates.
///
/// Streams are emitted in a fixed order (transactions, bills, goals, debts, budgets, recurring)
/// and then stably sorted by date, so same-instant events keep that order.
pub fn aggregate(
    data: &UserSnapshot,
    window: CalendarWindow,
    now: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    let mut events = Vec::new();

    events.extend(
        data.transactions
            .iter()
            .filter(|t| window.contains(t.date))
            .map(transaction_event),
    );
    events.extend(
        data.bills
            .iter()
            .filter(|b| window.contains(b.due_date))
            .map(bill_event),
    );
    events.extend(
        data.goals
            .iter()
            .filter(|g| window.contains(g.end_date))
            .map(goal_event),
    );
    events.extend(
        data.debts
            .iter()
            .filter(|d| d.is_active())
            .filter_map(|d| debt_event(d, now))
            .filter(|e| window.contains(e.date)),
    );

    // Budgets are anchored to the window's month, not to anything stored on the budget.
    if let Some(anchor) = dates::month_start(window.start).filter(|a| window.contains(*a)) {
        events.extend(data.budgets.iter().map(|b| budget_event(b, anchor)));
    }

    for template in data.recurring.iter().filter(|r| r.is_active) {
        let frequency = match template.frequency.parse::<Frequency>() {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(recurring_id = %template.id, error = %err, "skipping recurring template");
                continue;
            }
        };
        events.extend(
            recurrence::expand(template.start_date, template.end_date, frequency, window)
                .into_iter()
                .map(|at| recurring_event(template, frequency, at)),
        );
    }

    events.sort_by_key(|e| e.date);
    events
}

fn transaction_event(t: &Transaction) -> CalendarEvent {
    CalendarEvent {
        id: t.id.to_string(),
        details: EventDetails::Transaction,
        date: t.date,
        title: t.description.clone(),
        amount: t.amount,
        category: Some(t.category.clone()),
        status: None,
        color: if t.is_income() {
            EventColor::Green
        } else {
            EventColor::Red
        },
    }
}

fn bill_event(b: &Bill) -> CalendarEvent {
    let color = if b.is_paid() {
        EventColor::Green
    } else if b.is_overdue() {
        EventColor::Red
    } else {
        EventColor::Amber
    };

    CalendarEvent {
        id: b.id.to_string(),
        details: EventDetails::Bill,
        date: b.due_date,
        title: b.name.clone(),
        amount: b.amount,
        category: None,
        status: Some(b.status.clone()),
        color,
    }
}

fn goal_event(g: &Goal) -> CalendarEvent {
    CalendarEvent {
        id: g.id.to_string(),
        details: EventDetails::Goal {
            progress: g.progress(),
            status: g.status.clone(),
        },
        date: g.end_date,
        title: format!("Goal: {}", g.name),
        amount: g.target_amount,
        category: g.category.clone(),
        status: Some(g.status.clone()),
        color: if g.is_completed() {
            EventColor::Green
        } else {
            EventColor::Blue
        },
    }
}

fn debt_event(d: &Debt, now: DateTime<Utc>) -> Option<CalendarEvent> {
    let Some(date) = dates::next_monthly_due(d.due_day, now) else {
        tracing::debug!(debt_id = %d.id, due_day = d.due_day, "debt has no valid due day");
        return None;
    };

    Some(CalendarEvent {
        id: d.id.to_string(),
        details: EventDetails::Debt {
            balance: d.current_balance,
        },
        date,
        title: format!("{} Payment", d.name),
        amount: d.minimum_payment,
        category: None,
        status: Some(d.status.clone()),
        color: EventColor::Amber,
    })
}

fn budget_event(b: &Budget, anchor: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: b.id.to_string(),
        details: EventDetails::Budget {
            period: b.period.clone(),
        },
        date: anchor,
        title: format!("{} Budget", b.category),
        amount: b.limit,
        category: Some(b.category.clone()),
        status: None,
        color: EventColor::Indigo,
    }
}

fn recurring_event(
    r: &RecurringTransaction,
    frequency: Frequency,
    at: DateTime<Utc>,
) -> CalendarEvent {
    CalendarEvent {
        id: format!("{}-{}", r.id, at.timestamp_millis()),
        details: EventDetails::Recurring {
            frequency,
            kind: r.kind.clone(),
        },
        date: at,
        title: r.description.clone(),
        amount: r.amount,
        category: Some(r.category.clone()),
        status: None,
        color: if r.is_income() {
            EventColor::Purple
        } else {
            EventColor::Pink
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::source::InMemorySource;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn march_2024() -> CalendarWindow {
        CalendarWindow::new(
            utc(2024, 3, 1),
            Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap(),
        )
    }

    fn transaction(date: DateTime<Utc>, amount: f64, kind: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            date,
            description: "Groceries".to_string(),
            amount,
            category: "food".to_string(),
            kind: kind.to_string(),
        }
    }

    fn bill(due_date: DateTime<Utc>, status: &str) -> Bill {
        Bill {
            id: Uuid::new_v4(),
            due_date,
            name: "Electricity".to_string(),
            amount: 80.0,
            status: status.to_string(),
        }
    }

    fn goal(end_date: DateTime<Utc>, status: &str) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            end_date,
            name: "Emergency fund".to_string(),
            target_amount: 1000.0,
            current_amount: 250.0,
            category: Some("savings".to_string()),
            status: status.to_string(),
        }
    }

    fn debt(due_day: i32, status: &str) -> Debt {
        Debt {
            id: Uuid::new_v4(),
            status: status.to_string(),
            due_day,
            name: "Car loan".to_string(),
            minimum_payment: 300.0,
            current_balance: 9000.0,
        }
    }

    fn budget(category: &str) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            category: category.to_string(),
            limit: 400.0,
            period: "monthly".to_string(),
        }
    }

    fn recurring(start_date: DateTime<Utc>, frequency: &str, is_active: bool) -> RecurringTransaction {
        RecurringTransaction {
            id: Uuid::new_v4(),
            is_active,
            start_date,
            end_date: None,
            frequency: frequency.to_string(),
            description: "Gym".to_string(),
            amount: 25.0,
            category: "health".to_string(),
            kind: "expense".to_string(),
        }
    }

    fn assert_window_and_order(events: &[CalendarEvent], window: CalendarWindow) {
        for e in events {
            assert!(window.contains(e.date), "{} outside window", e.id);
        }
        for pair in events.windows(2) {
            assert!(pair[0].date <= pair[1].date);
        }
    }

    #[test]
    fn march_scenario_merges_and_sorts() {
        let tx = transaction(utc(2024, 3, 10), -50.0, "expense");
        let b = bill(utc(2024, 3, 5), "pending");
        let r = recurring(utc(2024, 2, 20), "weekly", true);
        let data = UserSnapshot {
            transactions: vec![tx.clone()],
            bills: vec![b.clone()],
            recurring: vec![r.clone()],
            ..Default::default()
        };

        let window = march_2024();
        let events = aggregate(&data, window, utc(2024, 3, 1));
        assert_window_and_order(&events, window);

        let summary: Vec<(&str, DateTime<Utc>, EventColor)> = events
            .iter()
            .map(|e| (e.details.type_name(), e.date, e.color))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("bill", utc(2024, 3, 5), EventColor::Amber),
                ("recurring", utc(2024, 3, 5), EventColor::Pink),
                ("transaction", utc(2024, 3, 10), EventColor::Red),
                ("recurring", utc(2024, 3, 12), EventColor::Pink),
                ("recurring", utc(2024, 3, 19), EventColor::Pink),
                ("recurring", utc(2024, 3, 26), EventColor::Pink),
            ]
        );
        assert_eq!(events[2].id, tx.id.to_string());
        assert_eq!(events[2].amount, -50.0);
        assert_eq!(
            events[1].id,
            format!("{}-{}", r.id, utc(2024, 3, 5).timestamp_millis())
        );
    }

    #[test]
    fn out_of_window_records_are_dropped() {
        let data = UserSnapshot {
            transactions: vec![transaction(utc(2024, 2, 29), 10.0, "income")],
            bills: vec![bill(utc(2024, 4, 1), "pending")],
            goals: vec![goal(utc(2025, 1, 1), "active")],
            ..Default::default()
        };
        assert!(aggregate(&data, march_2024(), utc(2024, 3, 1)).is_empty());
    }

    #[test]
    fn colors_follow_type_and_status() {
        let data = UserSnapshot {
            transactions: vec![transaction(utc(2024, 3, 2), 1200.0, "income")],
            bills: vec![
                bill(utc(2024, 3, 3), "paid"),
                bill(utc(2024, 3, 4), "overdue"),
            ],
            ..Default::default()
        };
        let colors: Vec<EventColor> = aggregate(&data, march_2024(), utc(2024, 3, 1))
            .iter()
            .map(|e| e.color)
            .collect();
        assert_eq!(
            colors,
            vec![EventColor::Green, EventColor::Green, EventColor::Red]
        );
    }

    #[test]
    fn completed_goal_gets_distinct_color() {
        let data = UserSnapshot {
            goals: vec![
                goal(utc(2024, 3, 8), "completed"),
                goal(utc(2024, 3, 9), "active"),
            ],
            ..Default::default()
        };
        let events = aggregate(&data, march_2024(), utc(2024, 3, 1));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].color, EventColor::Green);
        assert_eq!(events[1].color, EventColor::Blue);
        assert_ne!(events[0].color, events[1].color);
        assert_eq!(
            events[1].details,
            EventDetails::Goal {
                progress: 25.0,
                status: "active".to_string()
            }
        );
    }

    #[test]
    fn active_debt_produces_single_next_occurrence() {
        let window = CalendarWindow::new(utc(2024, 3, 1), utc(2024, 6, 30));
        let data = UserSnapshot {
            debts: vec![debt(15, "active"), debt(15, "paid_off")],
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        let events = aggregate(&data, window, now);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, utc(2024, 4, 15));
        assert_eq!(events[0].color, EventColor::Amber);
        assert_eq!(events[0].details, EventDetails::Debt { balance: 9000.0 });
    }

    #[test]
    fn debt_due_outside_window_is_dropped() {
        let data = UserSnapshot {
            debts: vec![debt(15, "active")],
            ..Default::default()
        };
        // Next due date is 2024-04-15, after March.
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        assert!(aggregate(&data, march_2024(), now).is_empty());
    }

    #[test]
    fn budgets_anchor_to_window_month_start() {
        let data = UserSnapshot {
            budgets: vec![budget("food"), budget("transport")],
            ..Default::default()
        };
        let events = aggregate(&data, march_2024(), utc(2024, 3, 1));

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.date == utc(2024, 3, 1)));
        assert!(events.iter().all(|e| e.color == EventColor::Indigo));
        assert_eq!(events[0].title, "food Budget");
        assert_eq!(events[1].title, "transport Budget");
    }

    #[test]
    fn budgets_skipped_when_window_starts_mid_month() {
        let window = CalendarWindow::new(utc(2024, 3, 10), utc(2024, 4, 10));
        let data = UserSnapshot {
            budgets: vec![budget("food")],
            ..Default::default()
        };
        assert!(aggregate(&data, window, utc(2024, 3, 1)).is_empty());
    }

    #[test]
    fn monthly_template_expands_with_distinct_ids() {
        let window = CalendarWindow::new(
            utc(2024, 1, 1),
            Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
        );
        let data = UserSnapshot {
            recurring: vec![recurring(utc(2024, 1, 1), "monthly", true)],
            ..Default::default()
        };
        let events = aggregate(&data, window, utc(2024, 1, 1));

        assert_eq!(events.len(), 3);
        let ids: HashSet<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        let months: Vec<u32> = events
            .iter()
            .map(|e| chrono::Datelike::month(&e.date))
            .collect();
        assert_eq!(months, vec![1, 2, 3]);
    }

    #[test]
    fn inactive_and_unknown_frequency_templates_yield_nothing() {
        let window = CalendarWindow::new(utc(2000, 1, 1), utc(2030, 1, 1));
        let data = UserSnapshot {
            recurring: vec![
                recurring(utc(2024, 1, 1), "daily", false),
                recurring(utc(2024, 1, 1), "fortnightly", true),
            ],
            ..Default::default()
        };
        assert!(aggregate(&data, window, utc(2024, 1, 1)).is_empty());
    }

    #[test]
    fn income_template_is_purple() {
        let mut r = recurring(utc(2024, 3, 15), "monthly", true);
        r.kind = "income".to_string();
        let data = UserSnapshot {
            recurring: vec![r],
            ..Default::default()
        };
        let events = aggregate(&data, march_2024(), utc(2024, 3, 1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].color, EventColor::Purple);
    }

    #[test]
    fn same_instant_events_keep_stream_order() {
        let at = utc(2024, 3, 1);
        let data = UserSnapshot {
            recurring: vec![recurring(at, "monthly", true)],
            budgets: vec![budget("food")],
            goals: vec![goal(at, "active")],
            bills: vec![bill(at, "pending")],
            transactions: vec![transaction(at, -5.0, "expense")],
            ..Default::default()
        };
        let types: Vec<&str> = aggregate(&data, march_2024(), utc(2024, 3, 1))
            .iter()
            .map(|e| e.details.type_name())
            .collect();
        assert_eq!(
            types,
            vec!["transaction", "bill", "goal", "budget", "recurring"]
        );
    }

    #[tokio::test]
    async fn build_calendar_reads_through_source_and_clock() {
        let source = InMemorySource::new(UserSnapshot {
            debts: vec![debt(15, "active")],
            ..Default::default()
        });
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap());
        let window = CalendarWindow::new(utc(2024, 4, 1), utc(2024, 4, 30));

        let events = build_calendar(&source, &clock, Uuid::new_v4(), window)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, utc(2024, 4, 15));
        assert_eq!(events[0].title, "Car loan Payment");
    }
}
