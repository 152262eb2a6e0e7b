//! Cache Store Module
//!
//! Hash-sharded directory of entries. The directory lock only guards the
//! hash → bin mapping; each bin has its own lock for its entry list.
//!
//! Lock order is always directory, then one bin. `get_or_create` takes the
//! bin lock before releasing the directory lock so a bin can never be
//! removed between being found and being populated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::stats::CacheCounters;
use crate::cache::{CacheStats, Entry, Key};
use crate::error::{LookupError, Result};
use crate::tasks::Sweeper;

// == Bin ==
/// An entry with its key and last-touch time, guarded by the bin lock.
#[derive(Debug)]
struct Slot {
    key: Key,
    last_touch: DateTime<Utc>,
    entry: Arc<Entry>,
}

impl Slot {
    fn touch(&mut self, ts: DateTime<Utc>) {
        if ts > self.last_touch {
            self.last_touch = ts;
        }
    }

    fn is_idle(&self, now: DateTime<Utc>, expire_unused: Duration) -> bool {
        (now - self.last_touch)
            .to_std()
            .map_or(false, |idle| idle > expire_unused)
    }
}

/// Entries whose key hashes collide.
#[derive(Debug, Default)]
struct Bin {
    slots: Mutex<Vec<Slot>>,
}

#[derive(Debug)]
struct Directory {
    bins: Mutex<HashMap<u64, Arc<Bin>>>,
    counters: CacheCounters,
    expire_unused: Duration,
}

impl Directory {
    fn bins_snapshot(&self) -> Vec<(u64, Arc<Bin>)> {
        self.bins
            .lock()
            .iter()
            .map(|(hash, bin)| (*hash, Arc::clone(bin)))
            .collect()
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        let mut emptied = Vec::new();

        for (hash, bin) in self.bins_snapshot() {
            let is_empty = {
                let mut slots = bin.slots.lock();
                let before = slots.len();
                slots.retain(|slot| !slot.is_idle(now, self.expire_unused));
                evicted += before - slots.len();
                slots.is_empty()
            };
            if is_empty {
                emptied.push((hash, bin));
            }
        }

        for (hash, bin) in emptied {
            let mut bins = self.bins.lock();
            let Some(current) = bins.get(&hash).cloned() else {
                continue;
            };
            if !Arc::ptr_eq(&current, &bin) {
                continue;
            }
            // Re-check under both locks: a lookup may have refilled the bin.
            let slots = current.slots.lock();
            if slots.is_empty() {
                bins.remove(&hash);
            }
        }

        self.counters.record_sweep(evicted);
        if evicted > 0 {
            info!("Sweep at {}: evicted {} idle entries", now, evicted);
        } else {
            debug!("Sweep at {}: no idle entries found", now);
        }
        evicted
    }
}

// == Sharded Cache ==
/// Concurrent lookup cache with traffic-driven idle eviction.
#[derive(Debug)]
pub struct ShardedCache {
    directory: Arc<Directory>,
    sweeper: Option<Sweeper>,
}

impl ShardedCache {
    // == Constructor ==
    /// Creates a cache evicting entries idle for longer than `expire_unused`.
    ///
    /// A zero `expire_unused` disables eviction and no sweeper is started.
    pub fn new(expire_unused: Duration, gc_interval: Duration) -> Result<Self> {
        let directory = Arc::new(Directory {
            bins: Mutex::new(HashMap::new()),
            counters: CacheCounters::default(),
            expire_unused,
        });

        let sweeper = if expire_unused.is_zero() {
            None
        } else {
            let target = Arc::clone(&directory);
            let sweeper = Sweeper::spawn(gc_interval, move |ts| {
                target.sweep(ts);
            })
            .map_err(|e| LookupError::Internal(format!("failed to start sweeper: {}", e)))?;
            Some(sweeper)
        };

        Ok(Self { directory, sweeper })
    }

    // == Get Or Create ==
    /// Returns the entry for `key`, creating it on first use.
    ///
    /// The entry's last-touch time advances to `ts`.
    pub fn get_or_create(&self, key: Key, ts: DateTime<Utc>) -> Arc<Entry> {
        let hash = key.hash_value();

        let mut bins = self.directory.bins.lock();
        let bin = Arc::clone(bins.entry(hash).or_default());
        let mut slots = bin.slots.lock();
        drop(bins);

        if let Some(slot) = slots.iter_mut().find(|slot| slot.key == key) {
            slot.touch(ts);
            self.directory.counters.record_hit();
            return Arc::clone(&slot.entry);
        }

        let entry = Arc::new(Entry::new());
        slots.push(Slot {
            key,
            last_touch: ts,
            entry: Arc::clone(&entry),
        });
        self.directory.counters.record_miss();
        entry
    }

    // == Signal ==
    /// Feeds a reference timestamp to the sweeper, if eviction is enabled.
    pub fn signal(&self, ts: DateTime<Utc>) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.signal(ts);
        }
    }

    // == Sweep ==
    /// Evicts every entry idle for longer than `expire_unused` at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.directory.sweep(now)
    }

    // == Close ==
    /// Stops the sweeper. No eviction happens afterwards.
    pub fn close(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
    }

    /// Returns true if a sweeper thread was started.
    pub fn eviction_enabled(&self) -> bool {
        self.sweeper.is_some()
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.directory
            .bins_snapshot()
            .iter()
            .map(|(_, bin)| bin.slots.lock().len())
            .sum()
    }

    // == Is Empty ==
    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bins in the directory.
    pub fn bin_count(&self) -> usize {
        self.directory.bins.lock().len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.directory
            .counters
            .snapshot(self.bin_count(), self.len())
    }
}

impl Drop for ShardedCache {
    fn drop(&mut self) {
        self.close();
    }
}
