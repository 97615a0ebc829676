//! Background eviction of idle buckets.

use crate::store::QuotaStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn the periodic eviction sweep for `store`.
///
/// Every `interval` the task drops buckets that have gone untouched for
/// longer than `idle_cutoff`, bounding the store's memory. It runs on its
/// own schedule, independent of request traffic, until the process exits or
/// the returned handle is aborted. Request handlers never wait on it beyond
/// the per-shard locks `sweep_idle` takes while dropping entries.
///
/// The removed count is reported per cycle at debug level; it is
/// observability, not control flow.
pub fn spawn_sweeper(
    store: Arc<QuotaStore>,
    interval: Duration,
    idle_cutoff: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval's first tick completes immediately; skip it so the first
        // real sweep lands one full interval after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.sweep_idle(idle_cutoff);
            if removed > 0 {
                debug!(target: "turnstile::sweep", removed, "evicted idle buckets");
            }
        }
    })
}
