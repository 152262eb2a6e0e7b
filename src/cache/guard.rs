//! Execution Guard Module
//!
//! Single-flight guard: one in-flight attempt at a time, and nothing more
//! to do once an attempt has succeeded.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

// == Execution Guard ==
/// Runs a fallible operation until it succeeds once.
///
/// Concurrent callers are serialized on the slow path; a caller that was
/// waiting re-checks completion before running the operation itself.
#[derive(Debug, Default)]
pub struct ExecutionGuard {
    done: AtomicBool,
    serial: Mutex<()>,
}

impl ExecutionGuard {
    // == Constructor ==
    /// Creates an unsatisfied guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once an attempt has succeeded.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    // == Run ==
    /// Runs `op` unless a previous attempt already succeeded.
    ///
    /// Returns `Ok(())` without calling `op` when the guard is satisfied.
    /// A failed attempt leaves the guard unsatisfied and returns its error.
    pub fn run<E, F>(&self, op: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        if self.is_done() {
            return Ok(());
        }

        let _serial = self.serial.lock();
        if self.is_done() {
            return Ok(());
        }

        op()?;
        self.done.store(true, Ordering::Release);
        Ok(())
    }
}
