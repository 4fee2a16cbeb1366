//! Monotonic reference-point timer used to pace animation frames.

use std::time::{Duration, Instant};

/// Remembers the instant of the last [`mark`](Self::mark) and answers whether
/// a given duration has passed since then.
///
/// Checking never resets the reference point; callers re-mark after acting on
/// a `true` result.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    previous: Instant,
}

impl FrameTimer {
    /// Create a timer marked at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
        }
    }

    /// Record the current instant as the reference point.
    pub fn mark(&mut self) {
        self.mark_at(Instant::now());
    }

    /// Record `now` as the reference point.
    pub fn mark_at(&mut self, now: Instant) {
        self.previous = now;
    }

    /// Time since the last mark.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.previous.elapsed()
    }

    /// Whether strictly more than `duration` has passed since the last mark.
    #[must_use]
    pub fn has_elapsed(&self, duration: Duration) -> bool {
        self.has_elapsed_at(Instant::now(), duration)
    }

    /// [`has_elapsed`](Self::has_elapsed) evaluated at `now`.
    ///
    /// An instant earlier than the reference point counts as zero elapsed.
    #[must_use]
    pub fn has_elapsed_at(&self, now: Instant, duration: Duration) -> bool {
        now.saturating_duration_since(self.previous) > duration
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
