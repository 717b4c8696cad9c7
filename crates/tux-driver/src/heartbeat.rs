//! Connection Monitor - detects a silent dongle link
//!
//! Every inbound status frame counts as feedback. When the link stays silent
//! longer than the configured timeout the connection channels are marked
//! stale, once per silence period.
//!
//! Time is stored as microseconds since process start in an `AtomicU64`, so
//! the monitor is lock-free and unaffected by wall clock changes.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static APP_START: OnceLock<Instant> = OnceLock::new();

fn get_monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Connection health monitor
#[derive(Debug)]
pub struct ConnectionMonitor {
    last_feedback: AtomicU64,
    timeout: Duration,
    /// Set once the current silence period has been reported
    stale_reported: AtomicBool,
}

impl ConnectionMonitor {
    /// Create a new connection monitor
    ///
    /// # Parameters
    /// - `timeout`: Maximum duration without feedback before the link is considered silent
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_feedback: AtomicU64::new(get_monotonic_micros()),
            timeout,
            stale_reported: AtomicBool::new(false),
        }
    }

    /// Returns true if feedback was received within the timeout window
    pub fn check_connection(&self) -> bool {
        self.time_since_last_feedback() < self.timeout
    }

    /// Register feedback from the dongle, ending any silence period
    pub fn register_feedback(&self) {
        self.last_feedback.store(get_monotonic_micros(), Ordering::Relaxed);
        self.stale_reported.store(false, Ordering::Relaxed);
    }

    /// Returns true exactly once per silence period, when the timeout first expires
    pub fn take_stale(&self) -> bool {
        if self.check_connection() {
            return false;
        }
        !self.stale_reported.swap(true, Ordering::Relaxed)
    }

    /// Get time since last feedback
    pub fn time_since_last_feedback(&self) -> Duration {
        let last_us = self.last_feedback.load(Ordering::Relaxed);
        Duration::from_micros(get_monotonic_micros().saturating_sub(last_us))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
