//! Lookup Cache - memoized event enrichment
//!
//! Caches the result of an expensive lookup per compound key extracted from
//! events, with single-flight execution, failure backoff and idle eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod lookup;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::{Config, LookupConfig};
pub use event::Event;
pub use lookup::{CachedLookupEngine, Runner};
