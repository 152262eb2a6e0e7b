//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key hashing, entry identity and idle eviction.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::cache::{Key, ShardedCache};

// == Test Configuration ==
const TEST_EXPIRE_SECS: u64 = 60;
const TEST_GC_INTERVAL: Duration = Duration::from_secs(1 << 30);

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

// == Strategies ==
/// Generates key field values
fn field_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{0,8}".prop_map(|s| s)
}

/// Generates compound keys of one to four fields
fn key_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(field_strategy(), 1..4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // **Property 1: Split Points Change the Hash**
    // *For any* string cut at two different points into a two-field key,
    // the two keys SHALL differ and hash differently.
    #[test]
    fn prop_split_point_changes_hash(
        joined in "[a-z]{2,16}",
        a in 1usize..16,
        b in 1usize..16,
    ) {
        let len = joined.len();
        let (a, b) = (a % len, b % len);
        prop_assume!(a != b);

        let left = Key::new(vec![joined[..a].to_string(), joined[a..].to_string()]);
        let right = Key::new(vec![joined[..b].to_string(), joined[b..].to_string()]);

        prop_assert_ne!(&left, &right);
        prop_assert_ne!(left.hash_value(), right.hash_value());
    }

    // **Property 2: One Entry per Distinct Key**
    // *For any* sequence of keys, the cache SHALL hold exactly one entry per
    // distinct key, and repeated lookups SHALL return the same entry.
    #[test]
    fn prop_one_entry_per_distinct_key(keys in prop::collection::vec(key_strategy(), 1..50)) {
        let cache = ShardedCache::new(Duration::from_secs(TEST_EXPIRE_SECS), TEST_GC_INTERVAL).unwrap();
        let distinct: HashSet<Vec<String>> = keys.iter().cloned().collect();

        for fields in &keys {
            let first = cache.get_or_create(Key::new(fields.clone()), at(0));
            let second = cache.get_or_create(Key::new(fields.clone()), at(0));
            prop_assert!(Arc::ptr_eq(&first, &second));
        }

        prop_assert_eq!(cache.len(), distinct.len());
        let stats = cache.stats();
        prop_assert_eq!(stats.misses as usize, distinct.len());
        prop_assert_eq!(stats.hits as usize, keys.len() * 2 - distinct.len());
    }

    // **Property 3: Sweeps Remove Exactly the Idle Entries**
    // *For any* set of entries touched at various times, a sweep at time T
    // SHALL evict exactly those idle for longer than the expiry and leave
    // no empty bins behind.
    #[test]
    fn prop_sweep_removes_idle_only(
        touches in prop::collection::vec((key_strategy(), 0i64..200), 1..50),
        now in 0i64..300,
    ) {
        let cache = ShardedCache::new(Duration::from_secs(TEST_EXPIRE_SECS), TEST_GC_INTERVAL).unwrap();
        let mut latest = std::collections::HashMap::new();

        for (fields, secs) in &touches {
            cache.get_or_create(Key::new(fields.clone()), at(*secs));
            let slot = latest.entry(fields.clone()).or_insert(*secs);
            *slot = (*slot).max(*secs);
        }

        let expected_idle = latest
            .values()
            .filter(|secs| now - **secs > TEST_EXPIRE_SECS as i64)
            .count();

        prop_assert_eq!(cache.sweep(at(now)), expected_idle);
        prop_assert_eq!(cache.len(), latest.len() - expected_idle);
        prop_assert!(cache.bin_count() <= cache.len());
    }
}
