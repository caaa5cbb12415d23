//! In-memory logout registry.
//!
//! Access tokens are stateless, so a logout is remembered here as
//! `user_id -> logout_at`. Any access token for that user issued at or
//! before `logout_at` is treated as revoked. A record is useless once every
//! token it could revoke is rejected by the decoder on expiry alone, so a
//! background sweep evicts records older than the access-token lifetime plus
//! the decoder's leeway, and the map stays bounded by the number of users
//! who logged out within that window.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type Records = DashMap<i64, DateTime<Utc>>;

/// Concurrent revocation map with a cancellable sweep task.
pub struct LogoutRegistry {
    records: Arc<Records>,
    retention: chrono::Duration,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LogoutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogoutRegistry")
            .field("records", &self.records.len())
            .field("retention", &self.retention)
            .finish()
    }
}

impl LogoutRegistry {
    /// Create the registry and spawn its sweep task.
    ///
    /// `leeway` must match the access-token decoder's expiry leeway. A
    /// record is kept for `access_ttl + leeway` plus one second, since
    /// `iat` and `exp` are whole seconds.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(access_ttl: Duration, leeway: Duration, sweep_interval: Duration) -> Self {
        let records: Arc<Records> = Arc::new(DashMap::new());
        let retention = access_ttl
            .saturating_add(leeway)
            .saturating_add(Duration::from_secs(1));
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(sweep_loop(
            Arc::clone(&records),
            retention,
            sweep_interval.max(Duration::from_millis(1)),
            cancel.clone(),
        ));

        Self {
            records,
            retention,
            cancel,
            sweeper: Mutex::new(Some(handle)),
        }
    }

    /// Record a logout for `user_id` now. Returns the effective timestamp,
    /// which never moves backwards for a user.
    pub fn record(&self, user_id: i64) -> DateTime<Utc> {
        self.record_at(user_id, Utc::now())
    }

    pub(crate) fn record_at(&self, user_id: i64, at: DateTime<Utc>) -> DateTime<Utc> {
        let mut entry = self.records.entry(user_id).or_insert(at);
        if at > *entry {
            *entry = at;
        }
        *entry
    }

    /// The latest logout recorded for `user_id`.
    pub fn logout_at(&self, user_id: i64) -> Option<DateTime<Utc>> {
        self.records.get(&user_id).map(|at| *at)
    }

    /// Whether a token for `user_id` issued at `issued_at` (Unix seconds)
    /// predates the user's last logout. Inclusive at second precision.
    pub fn is_revoked(&self, user_id: i64, issued_at: i64) -> bool {
        self.records
            .get(&user_id)
            .is_some_and(|at| issued_at <= at.timestamp())
    }

    /// Evict records whose tokens have all expired. Returns the number
    /// evicted.
    pub fn sweep(&self) -> usize {
        sweep_records(&self.records, self.retention, Utc::now())
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no logouts are being tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stop the sweep task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.sweeper.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = handle.await;
            info!("Logout registry sweeper stopped");
        }
    }
}

impl Drop for LogoutRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn sweep_records(records: &Records, retention: chrono::Duration, now: DateTime<Utc>) -> usize {
    let before = records.len();
    // A retention past the calendar's end keeps the record forever.
    records.retain(|_, at| at.checked_add_signed(retention).is_none_or(|end| end >= now));
    before.saturating_sub(records.len())
}

async fn sweep_loop(
    records: Arc<Records>,
    retention: chrono::Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = sweep_records(&records, retention, Utc::now());
                if evicted > 0 {
                    debug!(evicted, remaining = records.len(), "Swept logout records");
                }
            }
        }
    }
}
