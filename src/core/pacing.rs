//! Respectful delays between outbound requests.
//!
//! Two independent pauses apply: one between successive queries to the same
//! store, and a longer one after every store. Both are policy values carried
//! in configuration. Sleeping goes through [`Sleeper`] so tests can record the
//! pauses instead of waiting them out.

use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_STORE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub query_delay: Duration,
    pub store_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            query_delay: DEFAULT_QUERY_DELAY,
            store_delay: DEFAULT_STORE_DELAY,
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            query_delay: Duration::ZERO,
            store_delay: Duration::ZERO,
        }
    }
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested pauses without sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}
