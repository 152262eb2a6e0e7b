//! Lookup Engine Module
//!
//! Ties key extraction, the sharded cache, single-flight execution and
//! backoff together, and merges looked-up fields into events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStats, ShardedCache};
use crate::config::LookupConfig;
use crate::error::{ConfigError, LookupError, Result};
use crate::event::{self, Event};
use crate::lookup::{BackoffPolicy, BackoffRunner, KeyBuilder, Runner};

// == Lookup Stats ==
/// Point-in-time snapshot of engine metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupStats {
    /// Runner invocations
    pub runner_calls: u64,
    /// Runner invocations that failed
    pub runner_failures: u64,
    /// Lookups answered with a stored error inside the backoff window
    pub skipped_by_backoff: u64,
    /// Events passed through because no key could be built
    pub uncacheable_events: u64,
    /// Successful lookups whose fields could not be merged
    pub merge_failures: u64,
    /// Cache metrics
    pub cache: CacheStats,
}

#[derive(Debug, Default)]
struct EngineCounters {
    uncacheable: AtomicU64,
    merge_failures: AtomicU64,
}

// == Cached Lookup Engine ==
/// Enriches events with memoized runner results.
///
/// Every failure path returns the event unmodified (apart from the
/// optional error field); nothing here is fatal to the caller.
pub struct CachedLookupEngine {
    config: LookupConfig,
    keys: KeyBuilder,
    cache: ShardedCache,
    runner: BackoffRunner,
    counters: EngineCounters,
}

impl CachedLookupEngine {
    // == Constructor ==
    /// Creates an engine, starting the eviction sweeper if enabled.
    ///
    /// With no key fields configured, the runner's declared fields are used.
    pub fn new(config: LookupConfig, runner: Arc<dyn Runner>) -> Result<Self> {
        config.validate()?;

        let fields = if config.key.is_empty() {
            runner.key_fields()
        } else {
            config.key.clone()
        };
        if fields.is_empty() {
            return Err(ConfigError::NoKeyFields.into());
        }

        let cache = ShardedCache::new(config.expire_unused, config.gc_interval)?;
        let runner = BackoffRunner::new(BackoffPolicy::from(&config.backoff), runner);

        debug!("Lookup engine keyed on {:?}", fields);
        Ok(Self {
            keys: KeyBuilder::new(fields),
            cache,
            runner,
            counters: EngineCounters::default(),
            config,
        })
    }

    // == Run ==
    /// Looks up `event` and returns it, enriched on success.
    pub fn run(&self, event: Event) -> Event {
        match self.lookup(&event) {
            Ok(Some(fields)) => self.merge(event, &fields),
            Ok(None) => event,
            Err(err) => self.annotate(event, &err),
        }
    }

    // == Lookup ==
    /// Returns the cached (or freshly looked-up) fields for `event`.
    ///
    /// `Ok(None)` means the event carries no usable key.
    pub fn lookup(&self, event: &Event) -> Result<Option<Arc<Event>>> {
        let ts = event::timestamp(event, &self.config.timestamp_field).unwrap_or_else(Utc::now);

        let key = match self.keys.build(event) {
            Ok(key) => key,
            Err(err) => {
                debug!("Event not cacheable: {}", err);
                self.counters.uncacheable.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
        };

        let entry = self.cache.get_or_create(key, ts);
        self.cache.signal(ts);

        entry
            .guard()
            .run(|| self.runner.attempt(&entry, event))?;

        entry
            .fields()
            .map(Some)
            .ok_or_else(|| LookupError::Internal("completed lookup without fields".to_string()))
    }

    fn merge(&self, event: Event, fields: &Event) -> Event {
        let target = if self.config.fields_under_root {
            ""
        } else {
            self.config.target.as_str()
        };

        let mut merged = event.clone();
        match event::merge_at(&mut merged, target, fields) {
            Ok(()) => merged,
            Err(err) => {
                warn!("{}; event left unmodified", err);
                self.counters.merge_failures.fetch_add(1, Ordering::Relaxed);
                event
            }
        }
    }

    fn annotate(&self, event: Event, err: &LookupError) -> Event {
        let Some(field) = &self.config.error_field else {
            return event;
        };

        let mut annotated = event.clone();
        match event::put_path(&mut annotated, field, Value::String(err.to_string())) {
            Ok(()) => annotated,
            Err(put_err) => {
                warn!("Could not record lookup error: {}", put_err);
                event
            }
        }
    }

    // == Stats ==
    /// Returns current engine statistics.
    pub fn stats(&self) -> LookupStats {
        let runner = self.runner.counters();
        LookupStats {
            runner_calls: runner.calls.load(Ordering::Relaxed),
            runner_failures: runner.failures.load(Ordering::Relaxed),
            skipped_by_backoff: runner.skipped.load(Ordering::Relaxed),
            uncacheable_events: self.counters.uncacheable.load(Ordering::Relaxed),
            merge_failures: self.counters.merge_failures.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    /// Returns the key fields in effect.
    pub fn key_fields(&self) -> &[String] {
        self.keys.fields()
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &ShardedCache {
        &self.cache
    }

    // == Close ==
    /// Stops background eviction. Lookups keep working, without eviction.
    pub fn close(&self) {
        self.cache.close();
    }
}
