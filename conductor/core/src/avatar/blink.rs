//! Blink Cycle
//!
//! An endless close/reopen loop for Milo's eyes. Every cycle waits a random
//! interval, closes the eyes, and reopens them a fixed short time later.
//! Deadlines are chained from the previous deadline rather than from the
//! observed tick time, so a late tick never stretches the cycle.

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::Rng;

/// Blink timing parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlinkTiming {
    /// Shortest gap between two blinks
    pub interval_min: Duration,
    /// Longest gap between two blinks
    pub interval_max: Duration,
    /// How long the eyes stay closed
    pub closed_for: Duration,
}

impl Default for BlinkTiming {
    fn default() -> Self {
        Self {
            interval_min: Duration::from_millis(2100),
            interval_max: Duration::from_millis(4400),
            closed_for: Duration::from_millis(120),
        }
    }
}

impl BlinkTiming {
    fn interval_ms(&self) -> RangeInclusive<u64> {
        let min = self.interval_min.as_millis() as u64;
        let max = (self.interval_max.as_millis() as u64).max(min);
        min..=max
    }
}

/// Eye transitions produced by the cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlinkTransition {
    /// Eyes closed at this instant
    Closed(Instant),
    /// Eyes reopened at this instant
    Opened(Instant),
}

/// Self-rescheduling blink loop
#[derive(Clone, Debug)]
pub struct BlinkCycle {
    timing: BlinkTiming,
    next_close: Option<Instant>,
    open_at: Option<Instant>,
}

impl BlinkCycle {
    /// Create an idle cycle; call [`BlinkCycle::start`] to begin blinking
    ///
    /// The closed interval is clamped below the shortest cycle so the eyes
    /// always reopen before the next blink.
    #[must_use]
    pub fn new(mut timing: BlinkTiming) -> Self {
        let ceiling = timing.interval_min.saturating_sub(Duration::from_millis(1));
        timing.closed_for = timing.closed_for.min(ceiling);
        Self {
            timing,
            next_close: None,
            open_at: None,
        }
    }

    /// Timing in effect
    #[must_use]
    pub fn timing(&self) -> &BlinkTiming {
        &self.timing
    }

    /// Schedule the first blink one random interval from `now`
    pub fn start<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        self.next_close = Some(now + self.sample(rng));
        self.open_at = None;
    }

    /// Whether the loop is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.next_close.is_some()
    }

    /// Whether the eyes are currently closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.open_at.is_some()
    }

    /// Earliest pending transition
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.open_at, self.next_close) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply every transition due at or before `now`, oldest first
    pub fn advance<R: Rng>(&mut self, now: Instant, rng: &mut R) -> Vec<BlinkTransition> {
        let mut transitions = Vec::new();

        loop {
            match (self.open_at, self.next_close) {
                (Some(open), close) if open <= now && close.map_or(true, |c| open <= c) => {
                    self.open_at = None;
                    transitions.push(BlinkTransition::Opened(open));
                }
                (_, Some(close)) if close <= now => {
                    self.open_at = Some(close + self.timing.closed_for);
                    self.next_close = Some(close + self.sample(rng));
                    transitions.push(BlinkTransition::Closed(close));
                }
                _ => break,
            }
        }

        transitions
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.timing.interval_ms()))
    }
}
