//! Per-object exponential failure backoff
//!
//! Each key's delay starts at `base`, doubles on every consecutive failure
//! and is capped at `max`. A successful reconcile resets the key.

use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;

/// Initial retry delay after the first failure
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// Consecutive-failure counters keyed by object
#[derive(Debug)]
pub struct FailureBackoff<K: Eq + Hash> {
    base: Duration,
    max: Duration,
    failures: DashMap<K, u32>,
}

impl<K: Eq + Hash> Default for FailureBackoff<K> {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl<K: Eq + Hash> FailureBackoff<K> {
    /// Create a backoff with the given base and cap
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: DashMap::new(),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying
    pub fn next_delay(&self, key: K) -> Duration {
        let mut entry = self.failures.entry(key).or_insert(0);
        let attempt = *entry;
        *entry = attempt.saturating_add(1);

        // 2^31 seconds already dwarfs any sane cap
        let factor = 2u32.saturating_pow(attempt.min(31));
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Forget all failures recorded for `key`
    pub fn reset(&self, key: &K) {
        self.failures.remove(key);
    }

    /// Number of consecutive failures recorded for `key`
    pub fn failures(&self, key: &K) -> u32 {
        self.failures.get(key).map(|v| *v).unwrap_or(0)
    }
}
