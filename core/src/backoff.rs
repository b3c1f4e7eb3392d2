//! Retry delay bookkeeping for a single widget.
//!
//! The delay doubles on every consecutive failure, starting from the base and
//! never exceeding the ceiling. A success (or a manual retry) resets it.

use std::time::Duration;

pub const DEFAULT_BASE_DELAY_MS: u64 = 2_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    /// Delay handed out by the last failure; `None` after a reset.
    previous: Option<Duration>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            previous: None,
        }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Delay to wait before the next retry; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.previous {
            None => self.base,
            Some(prev) => prev.saturating_mul(2).min(self.max),
        };
        self.previous = Some(delay);
        delay
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Number of whole seconds shown for a remaining wait, rounded up.
    pub fn countdown_seconds(remaining: Duration) -> u64 {
        let millis = remaining.as_millis() as u64;
        millis.div_ceil(1_000)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_millis(DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }
}
