use std::time::Duration;

use fk_core::{Node, Path};
use fk_storage::SystemStorage;
use rand::Rng;
use tracing::debug;

/// Configures the bounded, jittered version of the original's unbounded
/// `while True: sleep(n)` lock-acquisition loop (spec.md §4.4 "Common
/// lock-acquisition loop", marked FIXME in the source; SPEC_FULL.md §6
/// generalizes it into a cap + jitter rather than guessing a new unbounded
/// default).
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub base_sleep: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn target(max_attempts: u32) -> Self {
        Self {
            base_sleep: Duration::from_secs(fk_core::constants::LOCK_RETRY_TARGET_SECS),
            max_attempts,
        }
    }

    pub fn parent(max_attempts: u32) -> Self {
        Self {
            base_sleep: Duration::from_secs(fk_core::constants::LOCK_RETRY_PARENT_SECS),
            max_attempts,
        }
    }
}

fn now_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs() as i64
}

fn jittered(base: Duration) -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..250);
    base + Duration::from_millis(jitter_ms)
}

/// Why `acquire_lock` failed to return a held lease.
pub enum LockError {
    /// Attempts were exhausted without ever observing an acquirable lease
    /// (spec.md §9 Open Questions: the original's `while True` loop is
    /// unbounded; this core bounds it and surfaces `retry_exhausted`).
    RetryExhausted,
    /// The underlying storage call itself failed.
    Storage(fk_core::FkError),
}

/// Attempt to acquire the lease at `path`, retrying on contention per
/// `policy`. Returns `(timestamp_used, node_observed)` on success.
pub async fn acquire_lock(
    storage: &dyn SystemStorage,
    path: &Path,
    policy: RetryPolicy,
) -> Result<(i64, Option<Node>), LockError> {
    for attempt in 0..policy.max_attempts {
        let ts = now_seconds();
        let (acquired, node) = storage.lock_node(path, ts).map_err(LockError::Storage)?;
        if acquired {
            return Ok((ts, node));
        }
        debug!(%path, attempt, "lease held by another worker, retrying");
        tokio::time::sleep(jittered(policy.base_sleep)).await;
    }
    Err(LockError::RetryExhausted)
}
