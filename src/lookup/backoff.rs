//! Backoff Module
//!
//! Throttles retries of failing lookups and records attempt outcomes
//! into cache entries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{Entry, Outcome};
use crate::config::BackoffConfig;
use crate::error::{LookupError, Result};
use crate::event::Event;
use crate::lookup::Runner;

// == Backoff Policy ==
/// Growing delay between retries of a failing lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    factor: f64,
    max: Duration,
}

impl BackoffPolicy {
    // == Constructor ==
    /// Creates a policy; a zero `base` disables throttling.
    pub fn new(base: Duration, factor: f64, max: Duration) -> Self {
        Self { base, factor, max }
    }

    /// Delay stored after the first failure.
    pub fn initial(&self) -> Duration {
        self.base.min(self.max)
    }

    // == Next ==
    /// Delay stored after a renewed failure: `prev * factor + prev`, capped.
    pub fn next(&self, prev: Duration) -> Duration {
        let grown = (prev.as_nanos() as f64 * (self.factor + 1.0)).round();
        if grown >= self.max.as_nanos() as f64 {
            return self.max;
        }
        Duration::from_nanos(grown as u64)
    }

    /// Returns true once `backoff` has elapsed since `failed_at`.
    pub fn ready(&self, failed_at: Instant, backoff: Duration, now: Instant) -> bool {
        now.saturating_duration_since(failed_at) >= backoff
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self::new(config.duration, config.factor, config.max)
    }
}

// == Runner Counters ==
#[derive(Debug, Default)]
pub(crate) struct RunnerCounters {
    pub(crate) calls: AtomicU64,
    pub(crate) failures: AtomicU64,
    pub(crate) skipped: AtomicU64,
}

// == Backoff Runner ==
/// Wraps a [`Runner`], consulting an entry's last outcome before each call.
pub struct BackoffRunner {
    policy: BackoffPolicy,
    runner: Arc<dyn Runner>,
    counters: RunnerCounters,
}

impl BackoffRunner {
    /// Creates a backoff-aware wrapper around `runner`.
    pub fn new(policy: BackoffPolicy, runner: Arc<dyn Runner>) -> Self {
        Self {
            policy,
            runner,
            counters: RunnerCounters::default(),
        }
    }

    pub(crate) fn counters(&self) -> &RunnerCounters {
        &self.counters
    }

    // == Attempt ==
    /// Runs the lookup for `entry` unless its last failure is still inside
    /// the backoff window, in which case the stored error is returned and
    /// the runner is not called.
    pub fn attempt(&self, entry: &Entry, event: &Event) -> Result<()> {
        match entry.outcome() {
            Some(Outcome::Failure {
                error,
                failed_at,
                backoff,
            }) => {
                if !self.policy.ready(failed_at, backoff, Instant::now()) {
                    self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                    debug!("Lookup skipped, backing off for {:?}", backoff);
                    return Err(error);
                }
                self.execute(entry, event, Some(backoff))
            }
            Some(Outcome::Success { .. }) | None => self.execute(entry, event, None),
        }
    }

    fn execute(
        &self,
        entry: &Entry,
        event: &Event,
        prev_backoff: Option<Duration>,
    ) -> Result<()> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);

        match self.runner.run(event) {
            Ok(fields) => {
                entry.set_outcome(Outcome::Success {
                    fields: Arc::new(fields),
                });
                Ok(())
            }
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                let backoff = match prev_backoff {
                    Some(prev) => self.policy.next(prev),
                    None => self.policy.initial(),
                };
                let error = LookupError::Runner(format!("{:#}", err));
                warn!("{}; next retry in {:?}", error, backoff);

                entry.set_outcome(Outcome::Failure {
                    error: error.clone(),
                    failed_at: Instant::now(),
                    backoff,
                });
                Err(error)
            }
        }
    }
}
