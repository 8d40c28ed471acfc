use chrono::{DateTime, Duration, Utc};

const DEFAULT_MIN_INTERVAL_SECS: i64 = 300;

/// Minimum spacing between two alert passes for the same user.
///
/// Holds no state of its own; the previous run time comes from the [`super::AlertStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub min_interval: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            min_interval: Duration::seconds(DEFAULT_MIN_INTERVAL_SECS),
        }
    }
}

impl Throttle {
    pub fn from_env() -> Self {
        let secs = std::env::var("ALERT_MIN_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|s| *s >= 0)
            .unwrap_or(DEFAULT_MIN_INTERVAL_SECS);
        Self {
            min_interval: Duration::seconds(secs),
        }
    }

    pub fn allows(&self, last_run_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_run_at {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.min_interval,
        }
    }
}
