//! Background Tasks Module
//!
//! Contains the background work that runs alongside lookups.
//!
//! # Tasks
//! - Eviction sweeper: removes idle cache entries when lookup traffic
//!   advances the clock past the gc interval

mod sweeper;

pub use sweeper::{Mailbox, Sweeper};
