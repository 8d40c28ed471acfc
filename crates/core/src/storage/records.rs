use crate::domain::records::{Bill, Budget, Debt, Goal, RecurringTransaction, Transaction};
use crate::source::UserDataSource;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// [`UserDataSource`] backed by the Postgres tables in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgUserData {
    pool: sqlx::PgPool,
}

impl PgUserData {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserDataSource for PgUserData {
    async fn fetch_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>, String, f64, String, String)>(
            "SELECT id, date, description, amount, category, type \
             FROM transactions \
             WHERE user_id = $1 \
             ORDER BY date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select transactions failed")?;

        Ok(rows
            .into_iter()
            .map(
                |(id, date, description, amount, category, kind)| Transaction {
                    id,
                    date,
                    description,
                    amount,
                    category,
                    kind,
                },
            )
            .collect())
    }

    async fn fetch_bills(&self, user_id: Uuid) -> Result<Vec<Bill>> {
        let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>, String, f64, String)>(
            "SELECT id, due_date, name, amount, status \
             FROM bills \
             WHERE user_id = $1 \
             ORDER BY due_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select bills failed")?;

        Ok(rows
            .into_iter()
            .map(|(id, due_date, name, amount, status)| Bill {
                id,
                due_date,
                name,
                amount,
                status,
            })
            .collect())
    }

    async fn fetch_goals(&self, user_id: Uuid) -> Result<Vec<Goal>> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                DateTime<Utc>,
                String,
                f64,
                f64,
                Option<String>,
                String,
            ),
        >(
            "SELECT id, end_date, name, target_amount, current_amount, category, status \
             FROM goals \
             WHERE user_id = $1 \
             ORDER BY end_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select goals failed")?;

        Ok(rows
            .into_iter()
            .map(
                |(id, end_date, name, target_amount, current_amount, category, status)| Goal {
                    id,
                    end_date,
                    name,
                    target_amount,
                    current_amount,
                    category,
                    status,
                },
            )
            .collect())
    }

    async fn fetch_debts(&self, user_id: Uuid) -> Result<Vec<Debt>> {
        let rows = sqlx::query_as::<_, (Uuid, String, i32, String, f64, f64)>(
            "SELECT id, status, due_day, name, minimum_payment, current_balance \
             FROM debts \
             WHERE user_id = $1 \
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select debts failed")?;

        Ok(rows
            .into_iter()
            .map(
                |(id, status, due_day, name, minimum_payment, current_balance)| Debt {
                    id,
                    status,
                    due_day,
                    name,
                    minimum_payment,
                    current_balance,
                },
            )
            .collect())
    }

    async fn fetch_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>> {
        let rows = sqlx::query_as::<_, (Uuid, String, f64, String)>(
            "SELECT id, category, limit_amount, period \
             FROM budgets \
             WHERE user_id = $1 \
             ORDER BY category ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select budgets failed")?;

        Ok(rows
            .into_iter()
            .map(|(id, category, limit, period)| Budget {
                id,
                category,
                limit,
                period,
            })
            .collect())
    }

    async fn fetch_recurring(&self, user_id: Uuid) -> Result<Vec<RecurringTransaction>> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                bool,
                DateTime<Utc>,
                Option<DateTime<Utc>>,
                String,
                String,
                f64,
                String,
                String,
            ),
        >(
            "SELECT id, is_active, start_date, end_date, frequency, description, amount, category, type \
             FROM recurring_transactions \
             WHERE user_id = $1 \
             ORDER BY start_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select recurring_transactions failed")?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    id,
                    is_active,
                    start_date,
                    end_date,
                    frequency,
                    description,
                    amount,
                    category,
                    kind,
                )| RecurringTransaction {
                    id,
                    is_active,
                    start_date,
                    end_date,
                    frequency,
                    description,
                    amount,
                    category,
                    kind,
                },
            )
            .collect())
    }
}

/// Every user id that owns at least one record the alert pass looks at.
pub async fn list_user_ids(pool: &sqlx::PgPool) -> Result<Vec<Uuid>> {
    let rows = sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM bills \
         UNION SELECT user_id FROM budgets \
         UNION SELECT user_id FROM goals \
         UNION SELECT user_id FROM debts",
    )
    .persistent(false)
    .fetch_all(pool)
    .await
    .context("select alert user ids failed")?;
    Ok(rows)
}
