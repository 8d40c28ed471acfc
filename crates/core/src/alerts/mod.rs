//! Derived notifications: rule evaluation over a user's snapshot, throttled per user.

pub mod rules;
pub mod throttle;

pub use rules::AlertRules;
pub use throttle::Throttle;

use crate::clock::Clock;
use crate::domain::alert::NewAlert;
use crate::source::UserDataSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Persistence the alert pass needs: run bookkeeping plus deduplicating inserts.
#[async_trait::async_trait]
pub trait AlertStore: Send + Sync {
    async fn last_run_at(&self, user_id: Uuid) -> anyhow::Result<Option<DateTime<Utc>>>;

    async fn record_run(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Returns how many alerts were new. Alerts whose dedupe key already exists are skipped.
    async fn insert_alerts(&self, user_id: Uuid, alerts: &[NewAlert]) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    #[serde(rename_all = "camelCase")]
    Throttled { last_run_at: DateTime<Utc> },
    Completed { evaluated: usize, inserted: u64 },
}

/// Runs every alert rule for one user unless the previous run is too recent.
pub async fn run_checks(
    source: &dyn UserDataSource,
    store: &dyn AlertStore,
    clock: &dyn Clock,
    rules: &AlertRules,
    throttle: Throttle,
    user_id: Uuid,
) -> anyhow::Result<CheckOutcome> {
    let now = clock.now();
    let last_run_at = store.last_run_at(user_id).await?;
    if let Some(last_run_at) = last_run_at {
        if !throttle.allows(Some(last_run_at), now) {
            tracing::debug!(%user_id, %last_run_at, "alert checks throttled");
            return Ok(CheckOutcome::Throttled { last_run_at });
        }
    }

    let data = source.snapshot(user_id).await?;
    let alerts = rules.evaluate(&data, now);
    let inserted = if alerts.is_empty() {
        0
    } else {
        store.insert_alerts(user_id, &alerts).await?
    };
    store.record_run(user_id, now).await?;

    tracing::info!(%user_id, evaluated = alerts.len(), inserted, "alert checks completed");

    Ok(CheckOutcome::Completed {
        evaluated: alerts.len(),
        inserted,
    })
}
