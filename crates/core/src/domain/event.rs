use crate::domain::records::Frequency;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// One entry of the calendar view. Built per request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(flatten)]
    pub details: EventDetails,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    pub title: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub color: EventColor,
}

/// Event `type` plus the fields that only make sense for that type.
///
/// Serialized as `"type": "<variant>"` with the fields under `"metadata"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "metadata", rename_all = "lowercase")]
pub enum EventDetails {
    Transaction,
    Bill,
    Goal {
        progress: f64,
        status: String,
    },
    Debt {
        balance: f64,
    },
    Budget {
        period: String,
    },
    Recurring {
        frequency: Frequency,
        #[serde(rename = "type")]
        kind: String,
    },
}

impl EventDetails {
    pub fn type_name(&self) -> &'static str {
        match self {
            EventDetails::Transaction => "transaction",
            EventDetails::Bill => "bill",
            EventDetails::Goal { .. } => "goal",
            EventDetails::Debt { .. } => "debt",
            EventDetails::Budget { .. } => "budget",
            EventDetails::Recurring { .. } => "recurring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventColor {
    Green,
    Red,
    Amber,
    Blue,
    Indigo,
    Purple,
    Pink,
}

impl EventColor {
    pub fn as_hex(self) -> &'static str {
        match self {
            EventColor::Green => "#10b981",
            EventColor::Red => "#ef4444",
            EventColor::Amber => "#f59e0b",
            EventColor::Blue => "#3b82f6",
            EventColor::Indigo => "#6366f1",
            EventColor::Purple => "#8b5cf6",
            EventColor::Pink => "#ec4899",
        }
    }
}

impl Serialize for EventColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_hex())
    }
}
