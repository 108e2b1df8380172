//! Liveness clock
//!
//! Remembers when a slave last applied a datagram so the engine can tell
//! "master has not started yet" apart from "master went silent".

use std::time::{Duration, Instant};

/// Time of the last successfully received datagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessClock {
    last_receive: Option<Instant>,
}

impl LivenessClock {
    /// Create a clock that has never seen a datagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if at least one datagram has been received.
    pub fn has_received(&self) -> bool {
        self.last_receive.is_some()
    }

    /// When the last datagram was received.
    pub fn last_receive(&self) -> Option<Instant> {
        self.last_receive
    }

    /// Record a successful receive at `now`.
    pub fn mark_received(&mut self, now: Instant) {
        self.last_receive = Some(now);
    }

    /// Time since the last receive, `None` before the first one.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_receive
            .map(|last| now.saturating_duration_since(last))
    }

    /// Check if more than `window` has passed since the last receive.
    ///
    /// A clock that never received anything is never stale.
    pub fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.elapsed(now).is_some_and(|elapsed| elapsed > window)
    }

    /// Forget every receive.
    pub fn reset(&mut self) {
        self.last_receive = None;
    }
}
