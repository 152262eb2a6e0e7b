//! Lookup Module
//!
//! The engine that enriches events with cached lookup results, the
//! backoff-aware runner wrapper and the pluggable runner contract.

mod backoff;
mod engine;
mod key_builder;
mod runner;

pub use backoff::{BackoffPolicy, BackoffRunner};
pub use engine::{CachedLookupEngine, LookupStats};
pub use key_builder::{key_string, KeyBuilder};
pub use runner::{CommandRunner, FnRunner, Runner};
