//! Concurrent per-key token bucket registry.

use crate::clock::Clock;
use crate::key::ClientKey;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// One full refill cycle: a bucket earns `capacity` tokens per minute.
const REFILL_WINDOW_MILLIS: f64 = 60_000.0;

/// Per-key quota state. Owned exclusively by the store; never handed out.
#[derive(Debug)]
struct Bucket {
    /// Tokens currently available, `0.0..=capacity`. Fractional refill is
    /// retained, so an idle half-window earns half a bucket back, not zero.
    tokens: f64,
    /// Clock reading at the last refill.
    last_refill_millis: u64,
    /// Clock reading at the last consume attempt, admitted or not.
    /// Drives eviction and nothing else.
    last_access_millis: u64,
}

impl Bucket {
    fn full(capacity: u32, now_millis: u64) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_refill_millis: now_millis,
            last_access_millis: now_millis,
        }
    }

    /// Credit tokens earned since the last refill, capped at capacity.
    fn refill(&mut self, capacity: u32, now_millis: u64) {
        let elapsed = now_millis.saturating_sub(self.last_refill_millis);
        if elapsed == 0 {
            return;
        }
        let earned = elapsed as f64 * f64::from(capacity) / REFILL_WINDOW_MILLIS;
        self.tokens = (self.tokens + earned).min(f64::from(capacity));
        self.last_refill_millis = now_millis;
    }
}

/// Process-wide registry mapping [`ClientKey`] to its token bucket.
///
/// Buckets are created lazily on first sight of a key and removed only by
/// [`QuotaStore::sweep_idle`]. The map's per-shard locking makes
/// get-or-create atomic: racing first requests for one key observe exactly
/// one bucket, and each consume is charged against that shared instance.
/// There is no global lock; requests for different keys proceed
/// independently.
#[derive(Debug)]
pub struct QuotaStore {
    buckets: DashMap<ClientKey, Bucket>,
    capacity: u32,
    clock: Arc<dyn Clock>,
}

impl QuotaStore {
    /// Build a store where every key may spend `capacity` requests per
    /// rolling minute. Capacity is uniform across keys and fixed for the
    /// life of the store.
    pub fn new(capacity: u32, clock: Arc<dyn Clock>) -> Self {
        Self { buckets: DashMap::new(), capacity, clock }
    }

    /// Capacity applied to every bucket.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Consume one token for `key`, creating a full bucket on first sight.
    ///
    /// Returns `true` when the request is admitted. Never suspends; the only
    /// wait is the shard lock guarding the entry, held for the few
    /// arithmetic operations below.
    pub fn try_admit(&self, key: &ClientKey) -> bool {
        let now = self.clock.now_millis();
        let mut entry = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| Bucket::full(self.capacity, now));
        let bucket = entry.value_mut();

        bucket.refill(self.capacity, now);
        bucket.last_access_millis = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets that have gone untouched for longer than `idle_cutoff`,
    /// returning how many were removed.
    ///
    /// Recency of access is the only criterion; an empty bucket for a key
    /// that keeps knocking is never evicted. A `try_admit` racing the
    /// removal of its key simply recreates a full bucket; the key loses
    /// its token history, but no request is miscounted.
    pub fn sweep_idle(&self, idle_cutoff: Duration) -> usize {
        let now = self.clock.now_millis();
        let cutoff_millis = u64::try_from(idle_cutoff.as_millis()).unwrap_or(u64::MAX);
        let mut removed = 0usize;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_sub(bucket.last_access_millis) <= cutoff_millis;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no bucket is live.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// True when `key` currently has a bucket. Useful for tests and
    /// diagnostics; the answer can be stale by the time it returns.
    pub fn contains(&self, key: &ClientKey) -> bool {
        self.buckets.contains_key(key)
    }
}
