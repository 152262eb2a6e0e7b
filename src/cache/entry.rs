//! Cache Entry Module
//!
//! Per-key record shared by every caller looking up the same key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::ExecutionGuard;
use crate::error::LookupError;
use crate::event::Event;

// == Outcome ==
/// Result of the last lookup attempt for a key.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The runner produced these fields
    Success { fields: Arc<Event> },
    /// The runner failed; retries are throttled until `failed_at + backoff`
    Failure {
        error: LookupError,
        failed_at: Instant,
        backoff: Duration,
    },
}

impl Outcome {
    /// Returns true for a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

// == Entry ==
/// A cached lookup: the single-flight guard and the last outcome.
///
/// A brand-new entry has no outcome yet.
#[derive(Debug, Default)]
pub struct Entry {
    guard: ExecutionGuard,
    outcome: Mutex<Option<Outcome>>,
}

impl Entry {
    // == Constructor ==
    /// Creates an entry that has never been looked up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry's execution guard.
    pub fn guard(&self) -> &ExecutionGuard {
        &self.guard
    }

    /// Returns a copy of the last outcome.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.lock().clone()
    }

    /// Replaces the last outcome.
    pub fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock() = Some(outcome);
    }

    /// Returns the fields of a successful outcome.
    pub fn fields(&self) -> Option<Arc<Event>> {
        match &*self.outcome.lock() {
            Some(Outcome::Success { fields }) => Some(Arc::clone(fields)),
            _ => None,
        }
    }
}
