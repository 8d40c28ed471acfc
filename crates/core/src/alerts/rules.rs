use crate::calendar::dates;
use crate::domain::alert::{AlertKind, NewAlert};
use crate::domain::records::{Bill, Budget, Debt, Goal, Transaction, UserSnapshot};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Lookahead settings from the environment are clamped to 0..=MAX_HORIZON_DAYS.
const MAX_HORIZON_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct AlertRules {
    /// Unpaid bills and debt payments due within this many days raise a reminder.
    pub bill_due_soon_days: i64,

    /// Goals with a deadline within this many days raise a reminder.
    pub goal_deadline_days: i64,

    /// Fraction of a budget's limit at which a warning is raised (exceeding it is always raised).
    pub budget_warning_ratio: f64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            bill_due_soon_days: 3,
            goal_deadline_days: 7,
            budget_warning_ratio: 0.8,
        }
    }
}

impl AlertRules {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("BILL_DUE_SOON_DAYS") {
            if let Some(n) = parse_horizon_days(&s) {
                out.bill_due_soon_days = n;
            }
        }

        if let Ok(s) = std::env::var("GOAL_DEADLINE_DAYS") {
            if let Some(n) = parse_horizon_days(&s) {
                out.goal_deadline_days = n;
            }
        }

        if let Ok(s) = std::env::var("BUDGET_WARNING_RATIO") {
            if let Ok(n) = s.parse::<f64>() {
                out.budget_warning_ratio = n;
            }
        }

        out
    }

    /// Every alert condition that holds for `data` at `now`.
    pub fn evaluate(&self, data: &UserSnapshot, now: DateTime<Utc>) -> Vec<NewAlert> {
        let mut out = Vec::new();

        for bill in data.bills.iter().filter(|b| !b.is_paid()) {
            out.extend(self.check_bill(bill, now));
        }
        for budget in &data.budgets {
            out.extend(self.check_budget(budget, &data.transactions, now));
        }
        for goal in data.goals.iter().filter(|g| !g.is_completed()) {
            out.extend(self.check_goal(goal, now));
        }
        for debt in data.debts.iter().filter(|d| d.is_active()) {
            out.extend(self.check_debt(debt, now));
        }

        out
    }

    fn check_bill(&self, bill: &Bill, now: DateTime<Utc>) -> Option<NewAlert> {
        let due = bill.due_date.date_naive();
        if bill.due_date < now {
            return Some(NewAlert {
                kind: AlertKind::BillOverdue,
                title: format!("{} is overdue", bill.name),
                message: format!("{} of {:.2} was due on {due}.", bill.name, bill.amount),
                dedupe_key: format!("bill_overdue:{}:{due}", bill.id),
            });
        }

        if bill.due_date <= horizon(now, self.bill_due_soon_days) {
            return Some(NewAlert {
                kind: AlertKind::BillDueSoon,
                title: format!("{} is due soon", bill.name),
                message: format!("{} of {:.2} is due on {due}.", bill.name, bill.amount),
                dedupe_key: format!("bill_due_soon:{}:{due}", bill.id),
            });
        }

        None
    }

    fn check_budget(
        &self,
        budget: &Budget,
        transactions: &[Transaction],
        now: DateTime<Utc>,
    ) -> Option<NewAlert> {
        if budget.limit <= 0.0 {
            return None;
        }
        let period_start = period_start(&budget.period, now)?;

        let spent: f64 = transactions
            .iter()
            .filter(|t| t.is_expense() && t.category == budget.category)
            .filter(|t| period_start <= t.date && t.date <= now)
            .map(|t| t.amount.abs())
            .sum();
        let ratio = spent / budget.limit;
        let period = period_start.date_naive();

        if spent >= budget.limit {
            return Some(NewAlert {
                kind: AlertKind::BudgetExceeded,
                title: format!("{} budget exceeded", budget.category),
                message: format!(
                    "Spent {spent:.2} of {:.2} in the {} budget.",
                    budget.limit, budget.category
                ),
                dedupe_key: format!("budget_exceeded:{}:{period}", budget.id),
            });
        }

        if ratio >= self.budget_warning_ratio {
            return Some(NewAlert {
                kind: AlertKind::BudgetWarning,
                title: format!("{} budget at {:.0}%", budget.category, ratio * 100.0),
                message: format!(
                    "Spent {spent:.2} of {:.2} in the {} budget.",
                    budget.limit, budget.category
                ),
                dedupe_key: format!("budget_warning:{}:{period}", budget.id),
            });
        }

        None
    }

    fn check_goal(&self, goal: &Goal, now: DateTime<Utc>) -> Option<NewAlert> {
        if goal.target_amount > 0.0 && goal.current_amount >= goal.target_amount {
            return Some(NewAlert {
                kind: AlertKind::GoalReached,
                title: format!("{} reached", goal.name),
                message: format!(
                    "You saved {:.2} toward a target of {:.2}.",
                    goal.current_amount, goal.target_amount
                ),
                dedupe_key: format!("goal_reached:{}", goal.id),
            });
        }

        let deadline = goal.end_date;
        if now <= deadline && deadline <= horizon(now, self.goal_deadline_days) {
            return Some(NewAlert {
                kind: AlertKind::GoalDeadline,
                title: format!("{} deadline approaching", goal.name),
                message: format!(
                    "{:.0}% of {:.2} saved, deadline {}.",
                    goal.progress(),
                    goal.target_amount,
                    deadline.date_naive()
                ),
                dedupe_key: format!("goal_deadline:{}:{}", goal.id, deadline.date_naive()),
            });
        }

        None
    }

    fn check_debt(&self, debt: &Debt, now: DateTime<Utc>) -> Option<NewAlert> {
        let due = dates::next_monthly_due(debt.due_day, now)?;
        if due > horizon(now, self.bill_due_soon_days) {
            return None;
        }

        let day = due.date_naive();
        Some(NewAlert {
            kind: AlertKind::DebtPaymentDue,
            title: format!("{} payment due", debt.name),
            message: format!(
                "Minimum payment of {:.2} is due on {day}.",
                debt.minimum_payment
            ),
            dedupe_key: format!("debt_payment_due:{}:{day}", debt.id),
        })
    }
}

fn parse_horizon_days(s: &str) -> Option<i64> {
    s.trim()
        .parse::<i64>()
        .ok()
        .map(|n| n.clamp(0, MAX_HORIZON_DAYS))
}

/// `now` plus `days`, saturating at the latest representable instant.
fn horizon(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(if days < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Start of the budget period containing `now`. Weeks start on Monday; unknown periods are
/// treated as monthly.
pub fn period_start(period: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match period {
        "weekly" => {
            let monday =
                now.date_naive() - Duration::days(i64::from(now.weekday().num_days_from_monday()));
            Some(Utc.from_utc_datetime(&monday.and_hms_opt(0, 0, 0)?))
        }
        "yearly" => {
            let jan1 = NaiveDate::from_ymd_opt(now.year(), 1, 1)?;
            Some(Utc.from_utc_datetime(&jan1.and_hms_opt(0, 0, 0)?))
        }
        _ => dates::month_start(now),
    }
}
