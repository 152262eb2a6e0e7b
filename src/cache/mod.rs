//! Cache Module
//!
//! Provides the sharded, single-flight lookup cache with idle eviction.

mod entry;
mod guard;
mod key;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{Entry, Outcome};
pub use guard::ExecutionGuard;
pub use key::Key;
pub use stats::CacheStats;
pub use store::ShardedCache;
