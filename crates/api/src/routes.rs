use crate::error::{ok, ApiError, Envelope};
use crate::extract::AuthUser;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use fintrack_core::alerts::{self, CheckOutcome};
use fintrack_core::calendar::{self, CalendarWindow};
use fintrack_core::domain::alert::Alert;
use fintrack_core::domain::event::CalendarEvent;
use fintrack_core::domain::records::{
    Bill, Budget, Debt, Goal, RecurringTransaction, Transaction,
};
use fintrack_core::source::UserDataSource;
use fintrack_core::storage;
use fintrack_core::storage::alerts::PgAlertStore;
use fintrack_core::storage::records::PgUserData;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/calendar", get(get_calendar))
        .route("/transactions", get(list_transactions))
        .route("/bills", get(list_bills))
        .route("/goals", get(list_goals))
        .route("/debts", get(list_debts))
        .route("/budgets", get(list_budgets))
        .route("/recurring", get(list_recurring))
        .route("/alerts", get(list_alerts))
        .route("/alerts/check", post(check_alerts))
        .route("/alerts/:id/read", patch(mark_alert_read))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn require_pool(state: &AppState) -> Result<&PgPool, ApiError> {
    state.pool.as_ref().ok_or(ApiError::Unavailable)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarQuery {
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
}

pub(crate) async fn get_calendar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<CalendarQuery>,
) -> ApiResult<Vec<CalendarEvent>> {
    let window = CalendarWindow::parse(q.start_date.as_deref(), q.end_date.as_deref())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let pool = require_pool(&state)?;

    let source = PgUserData::new(pool.clone());
    let events = calendar::build_calendar(&source, state.clock.as_ref(), user_id, window).await?;
    Ok(ok(events))
}

async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Transaction>> {
    let source = PgUserData::new(require_pool(&state)?.clone());
    Ok(ok(source.fetch_transactions(user_id).await?))
}

async fn list_bills(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Bill>> {
    let source = PgUserData::new(require_pool(&state)?.clone());
    Ok(ok(source.fetch_bills(user_id).await?))
}

async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Goal>> {
    let source = PgUserData::new(require_pool(&state)?.clone());
    Ok(ok(source.fetch_goals(user_id).await?))
}

async fn list_debts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Debt>> {
    let source = PgUserData::new(require_pool(&state)?.clone());
    Ok(ok(source.fetch_debts(user_id).await?))
}

async fn list_budgets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Budget>> {
    let source = PgUserData::new(require_pool(&state)?.clone());
    Ok(ok(source.fetch_budgets(user_id).await?))
}

async fn list_recurring(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<RecurringTransaction>> {
    let source = PgUserData::new(require_pool(&state)?.clone());
    Ok(ok(source.fetch_recurring(user_id).await?))
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    unread: bool,
}

async fn list_alerts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<AlertsQuery>,
) -> ApiResult<Vec<Alert>> {
    let pool = require_pool(&state)?;
    Ok(ok(storage::alerts::list_alerts(pool, user_id, q.unread).await?))
}

async fn check_alerts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<CheckOutcome> {
    let pool = require_pool(&state)?;

    let Some(lock) = storage::lock::try_acquire_user_lock(pool, user_id).await? else {
        return Err(ApiError::Conflict("alert checks already running"));
    };

    let source = PgUserData::new(pool.clone());
    let store = PgAlertStore::new(pool.clone());
    let outcome = alerts::run_checks(
        &source,
        &store,
        state.clock.as_ref(),
        &state.rules,
        state.throttle,
        user_id,
    )
    .await;

    if let Err(e) = lock.release().await {
        tracing::warn!(%user_id, error = %e, "failed to release alert lock");
    }

    Ok(ok(outcome?))
}

#[derive(Debug, Serialize)]
struct MarkedRead {
    id: Uuid,
}

async fn mark_alert_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(alert_id): Path<Uuid>,
) -> ApiResult<MarkedRead> {
    let pool = require_pool(&state)?;
    if !storage::alerts::mark_read(pool, user_id, alert_id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(ok(MarkedRead { id: alert_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::alerts::{AlertRules, Throttle};
    use fintrack_core::clock::SystemClock;
    use std::sync::Arc;

    fn degraded_state() -> AppState {
        AppState {
            pool: None,
            auth: None,
            clock: Arc::new(SystemClock),
            rules: AlertRules::default(),
            throttle: Throttle::default(),
        }
    }

    fn query(start: Option<&str>, end: Option<&str>) -> Query<CalendarQuery> {
        Query(CalendarQuery {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn calendar_rejects_missing_window_before_touching_db() {
        let err = get_calendar(
            State(degraded_state()),
            AuthUser(Uuid::new_v4()),
            query(Some("2024-03-01"), None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn calendar_rejects_century_long_window() {
        let err = get_calendar(
            State(degraded_state()),
            AuthUser(Uuid::new_v4()),
            query(Some("0"), Some("8210266876799999")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn calendar_without_db_is_unavailable() {
        let err = get_calendar(
            State(degraded_state()),
            AuthUser(Uuid::new_v4()),
            query(Some("2024-03-01"), Some("2024-03-31")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
