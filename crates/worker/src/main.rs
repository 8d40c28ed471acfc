use anyhow::Context;
use clap::Parser;
use fintrack_core::alerts::{self, AlertRules, CheckOutcome, Throttle};
use fintrack_core::clock::{Clock, FixedClock, SystemClock};
use fintrack_core::source::UserDataSource;
use fintrack_core::storage::alerts::PgAlertStore;
use fintrack_core::storage::records::{self, PgUserData};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "fintrack_worker")]
struct Args {
    /// Only check this user. Defaults to every user with bills, budgets, goals or debts.
    #[arg(long)]
    user_id: Option<Uuid>,

    /// Evaluate rules and log what would fire, without writing alerts or run times.
    #[arg(long)]
    dry_run: bool,

    /// Evaluate as of this RFC 3339 instant instead of the current time.
    #[arg(long)]
    now: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fintrack_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let clock = resolve_clock(args.now.as_deref())?;

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    fintrack_core::storage::migrate(&pool).await?;

    let user_ids = match args.user_id {
        Some(id) => vec![id],
        None => records::list_user_ids(&pool).await?,
    };

    let rules = AlertRules::from_env();
    let throttle = Throttle::from_env();
    let source = PgUserData::new(pool.clone());
    let store = PgAlertStore::new(pool.clone());

    tracing::info!(users = user_ids.len(), dry_run = args.dry_run, "alert run starting");

    let mut failed: usize = 0;
    for user_id in user_ids {
        if args.dry_run {
            if let Err(err) = preview_alerts(&source, &rules, clock.now(), user_id).await {
                failed += 1;
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%user_id, error = %err, "dry-run alert evaluation failed");
            }
            continue;
        }

        let Some(lock) = fintrack_core::storage::lock::try_acquire_user_lock(&pool, user_id).await? else {
            tracing::warn!(%user_id, "user lock not acquired; another alert run in progress");
            continue;
        };

        match alerts::run_checks(&source, &store, clock.as_ref(), &rules, throttle, user_id).await {
            Ok(CheckOutcome::Throttled { last_run_at }) => {
                tracing::info!(%user_id, %last_run_at, "skipped; checked recently");
            }
            Ok(CheckOutcome::Completed { evaluated, inserted }) => {
                tracing::info!(%user_id, evaluated, inserted, "alert checks done");
            }
            Err(err) => {
                failed += 1;
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%user_id, error = %err, "alert checks failed");
            }
        }

        if let Err(err) = lock.release().await {
            tracing::warn!(%user_id, error = %err, "failed to release user lock");
        }
    }

    anyhow::ensure!(failed == 0, "alert checks failed for {failed} user(s)");
    Ok(())
}

/// Logs the alerts that would fire for one user and returns how many.
async fn preview_alerts(
    source: &dyn UserDataSource,
    rules: &AlertRules,
    now: chrono::DateTime<chrono::Utc>,
    user_id: Uuid,
) -> anyhow::Result<usize> {
    let data = source
        .snapshot(user_id)
        .await
        .with_context(|| format!("loading data for user {user_id}"))?;
    let alerts = rules.evaluate(&data, now);
    for alert in &alerts {
        tracing::info!(
            %user_id,
            kind = alert.kind.as_str(),
            dedupe_key = %alert.dedupe_key,
            title = %alert.title,
            "alert would fire (dry-run)"
        );
    }
    Ok(alerts.len())
}

fn resolve_clock(now_arg: Option<&str>) -> anyhow::Result<Box<dyn Clock>> {
    let Some(s) = now_arg else {
        return Ok(Box::new(SystemClock));
    };
    let now = chrono::DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("--now must be an RFC 3339 timestamp (got {s:?})"))?
        .with_timezone(&chrono::Utc);
    Ok(Box::new(FixedClock(now)))
}

fn init_sentry(settings: &fintrack_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
