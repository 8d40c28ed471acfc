use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use uuid::Uuid;

// Advisory locks are scoped to the Postgres session, so the guard pins the connection it was
// taken on. Used to keep two alert runs for the same user (API request vs. worker) from overlapping.
//
// A guard dropped without `release` (e.g. the request future was cancelled) closes its connection
// instead of returning it to the pool, so the session and its lock go away together.
const LOCK_NAMESPACE: i64 = 0x4649_4E54_524B; // "FINTRK"

fn lock_key_for_user(user_id: Uuid) -> i64 {
    let (hi, lo) = user_id.as_u64_pair();
    LOCK_NAMESPACE ^ (hi ^ lo) as i64
}

pub struct UserLock {
    conn: PoolConnection<Postgres>,
    key: i64,
    released: bool,
}

pub async fn try_acquire_user_lock(
    pool: &sqlx::PgPool,
    user_id: Uuid,
) -> anyhow::Result<Option<UserLock>> {
    let key = lock_key_for_user(user_id);
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection for advisory lock")?;
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;

    Ok(acquired.0.then_some(UserLock {
        conn,
        key,
        released: false,
    }))
}

impl UserLock {
    pub async fn release(mut self) -> anyhow::Result<()> {
        let key = self.key;
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .persistent(false)
            .bind(key)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("failed to release advisory lock (key={key})"))?;
        self.released = true;
        Ok(())
    }
}

impl Drop for UserLock {
    fn drop(&mut self) {
        if !self.released {
            self.conn.close_on_drop();
        }
    }
}
