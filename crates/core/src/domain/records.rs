//! User-scoped source records as fetched from storage.
//!
//! These are read-only snapshots; nothing in the core mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.kind == "income"
    }

    pub fn is_expense(&self) -> bool {
        self.kind == "expense"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub due_date: DateTime<Utc>,
    pub name: String,
    pub amount: f64,
    pub status: String,
}

impl Bill {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }

    pub fn is_overdue(&self) -> bool {
        self.status == "overdue"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub end_date: DateTime<Utc>,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub category: Option<String>,
    pub status: String,
}

impl Goal {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Percent of the target reached, 0 when the target is not positive.
    pub fn progress(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }
        self.current_amount / self.target_amount * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: Uuid,
    pub status: String,
    /// Day of month the payment falls on (1..=31).
    pub due_day: i32,
    pub name: String,
    pub minimum_payment: f64,
    pub current_balance: f64,
}

impl Debt {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub category: String,
    pub limit: f64,
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTransaction {
    pub id: Uuid,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Raw value as stored; parsed into [`Frequency`] when expanded.
    pub frequency: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl RecurringTransaction {
    pub fn is_income(&self) -> bool {
        self.kind == "income"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFrequency(pub String);

impl fmt::Display for UnknownFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown recurrence frequency: {:?}", self.0)
    }
}

impl std::error::Error for UnknownFrequency {}

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(UnknownFrequency(s.to_string())),
        }
    }
}

/// Everything the calendar and the alert pass read for one user.
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    pub transactions: Vec<Transaction>,
    pub bills: Vec<Bill>,
    pub goals: Vec<Goal>,
    pub debts: Vec<Debt>,
    pub budgets: Vec<Budget>,
    pub recurring: Vec<RecurringTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("Monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!(" weekly ".parse::<Frequency>(), Ok(Frequency::Weekly));
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn goal_progress_handles_zero_target() {
        let goal = Goal {
            id: Uuid::nil(),
            end_date: Utc::now(),
            name: "Trip".to_string(),
            target_amount: 0.0,
            current_amount: 50.0,
            category: None,
            status: "active".to_string(),
        };
        assert_eq!(goal.progress(), 0.0);

        let goal = Goal {
            target_amount: 200.0,
            ..goal
        };
        assert_eq!(goal.progress(), 25.0);
    }
}
