//! Eviction Sweeper
//!
//! Background thread that evicts idle cache entries. It has no timer of its
//! own: lookups deposit their reference timestamp into a single-slot
//! mailbox and the sweeper runs whenever that clock has advanced by at
//! least `gc_interval` since the previous sweep.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

// == Mailbox ==
#[derive(Debug, Default)]
struct MailboxState {
    pending: Option<DateTime<Utc>>,
    closed: bool,
}

/// Single-slot mailbox of timestamps.
///
/// A deposit overwrites any value not yet consumed; it never blocks and
/// never queues.
#[derive(Debug, Default)]
pub struct Mailbox {
    state: Mutex<MailboxState>,
    ready: Condvar,
}

impl Mailbox {
    /// Creates an empty, open mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposits a timestamp, replacing any pending one.
    ///
    /// Returns false if the mailbox is closed.
    pub fn deposit(&self, ts: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.pending = Some(ts);
        self.ready.notify_one();
        true
    }

    /// Blocks until a timestamp is available or the mailbox is closed.
    ///
    /// Returns `None` once closed; a value pending at close time is dropped.
    pub fn recv(&self) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(ts) = state.pending.take() {
                return Some(ts);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Closes the mailbox and wakes the receiver.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.pending = None;
        self.ready.notify_all();
    }
}

// == Sweeper ==
/// Handle to the background eviction thread.
#[derive(Debug)]
pub struct Sweeper {
    mailbox: Arc<Mailbox>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawns the sweeper thread.
    ///
    /// `sweep` is called with the triggering timestamp each time a sweep
    /// is due.
    pub fn spawn<F>(gc_interval: Duration, mut sweep: F) -> std::io::Result<Self>
    where
        F: FnMut(DateTime<Utc>) + Send + 'static,
    {
        let mailbox = Arc::new(Mailbox::new());
        let inbox = Arc::clone(&mailbox);

        let handle = thread::Builder::new()
            .name("lookup-sweeper".to_string())
            .spawn(move || {
                info!(
                    "Starting eviction sweeper with gc interval of {:?}",
                    gc_interval
                );

                let mut last_sweep: Option<DateTime<Utc>> = None;
                while let Some(ts) = inbox.recv() {
                    if !sweep_due(last_sweep, ts, gc_interval) {
                        continue;
                    }
                    last_sweep = Some(ts);
                    debug!("Sweep triggered at {}", ts);
                    sweep(ts);
                }

                info!("Eviction sweeper stopped");
            })?;

        Ok(Self {
            mailbox,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Hands a reference timestamp to the sweeper.
    pub fn signal(&self, ts: DateTime<Utc>) {
        self.mailbox.deposit(ts);
    }

    /// Stops the sweeper and waits for its thread to exit.
    ///
    /// Safe to call more than once.
    pub fn stop(&self) {
        self.mailbox.close();
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("Eviction sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sweep_due(last_sweep: Option<DateTime<Utc>>, ts: DateTime<Utc>, gc_interval: Duration) -> bool {
    match last_sweep {
        None => true,
        Some(last) => (ts - last)
            .to_std()
            .map_or(false, |elapsed| elapsed >= gc_interval),
    }
}
