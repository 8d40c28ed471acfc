use crate::alerts::AlertStore;
use crate::domain::alert::{Alert, AlertKind, NewAlert};
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: sqlx::PgPool,
}

impl PgAlertStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AlertStore for PgAlertStore {
    async fn last_run_at(&self, user_id: Uuid) -> anyhow::Result<Option<DateTime<Utc>>> {
        let last = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT last_run_at FROM alert_runs WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("select alert_runs failed")?;
        Ok(last)
    }

    async fn record_run(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO alert_runs (user_id, last_run_at) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET last_run_at = EXCLUDED.last_run_at",
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("upsert alert_runs failed")?;
        Ok(())
    }

    async fn insert_alerts(&self, user_id: Uuid, alerts: &[NewAlert]) -> anyhow::Result<u64> {
        anyhow::ensure!(!alerts.is_empty(), "alerts must be non-empty");

        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO alerts (user_id, type, title, message, dedupe_key) ",
        );
        qb.push_values(alerts, |mut b, alert| {
            b.push_bind(user_id)
                .push_bind(alert.kind.as_str())
                .push_bind(&alert.title)
                .push_bind(&alert.message)
                .push_bind(&alert.dedupe_key);
        });
        qb.push(" ON CONFLICT (user_id, dedupe_key) DO NOTHING");

        let res = qb
            .build()
            .persistent(false)
            .execute(&self.pool)
            .await
            .context("insert alerts failed")?;
        Ok(res.rows_affected())
    }
}

pub async fn list_alerts(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    unread_only: bool,
) -> anyhow::Result<Vec<Alert>> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, String, bool, DateTime<Utc>)>(
        "SELECT id, type, title, message, is_read, created_at \
         FROM alerts \
         WHERE user_id = $1 AND (NOT $2 OR NOT is_read) \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(pool)
    .await
    .context("select alerts failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, kind, title, message, is_read, created_at) in rows {
        let Some(kind) = AlertKind::from_db(&kind) else {
            tracing::warn!(alert_id = %id, kind = %kind, "skipping alert with unknown type");
            continue;
        };
        out.push(Alert {
            id,
            kind,
            title,
            message,
            is_read,
            created_at,
        });
    }
    Ok(out)
}

/// Returns false when no alert with that id belongs to the user.
pub async fn mark_read(pool: &sqlx::PgPool, user_id: Uuid, alert_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("UPDATE alerts SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(alert_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("update alerts failed")?;
    Ok(res.rows_affected() > 0)
}
