use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BillDueSoon,
    BillOverdue,
    BudgetWarning,
    BudgetExceeded,
    GoalDeadline,
    GoalReached,
    DebtPaymentDue,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::BillDueSoon => "bill_due_soon",
            AlertKind::BillOverdue => "bill_overdue",
            AlertKind::BudgetWarning => "budget_warning",
            AlertKind::BudgetExceeded => "budget_exceeded",
            AlertKind::GoalDeadline => "goal_deadline",
            AlertKind::GoalReached => "goal_reached",
            AlertKind::DebtPaymentDue => "debt_payment_due",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        Some(match s {
            "bill_due_soon" => AlertKind::BillDueSoon,
            "bill_overdue" => AlertKind::BillOverdue,
            "budget_warning" => AlertKind::BudgetWarning,
            "budget_exceeded" => AlertKind::BudgetExceeded,
            "goal_deadline" => AlertKind::GoalDeadline,
            "goal_reached" => AlertKind::GoalReached,
            "debt_payment_due" => AlertKind::DebtPaymentDue,
            _ => return None,
        })
    }
}

/// An alert produced by the rule pass, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    /// Identifies the condition that fired; storage ignores repeats of the same key.
    pub dedupe_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
