//! Deferred Actions
//!
//! A small deadline queue standing in for "run this later" callbacks. The
//! controller schedules events (settle the mood, start the intro wave) and
//! drains whatever is due on each tick. Nothing here touches a clock: the
//! caller always passes `now`, which keeps timing fully reproducible.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

#[derive(Debug)]
struct Entry<E> {
    at: Instant,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of events keyed by deadline
///
/// Events sharing a deadline come out in the order they were scheduled.
#[derive(Debug)]
pub struct Timeline<E> {
    queue: BinaryHeap<Reverse<Entry<E>>>,
    seq: u64,
}

impl<E> Timeline<E> {
    /// Create an empty timeline
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Schedule `event` to fire at `at`
    pub fn schedule(&mut self, at: Instant, event: E) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Entry { at, seq, event }));
    }

    /// Deadline of the earliest pending event
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(entry)| entry.at)
    }

    /// Remove and return every event due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: Instant) -> Vec<(Instant, E)> {
        let mut due = Vec::new();
        while self.next_deadline().is_some_and(|at| at <= now) {
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push((entry.at, entry.event));
            }
        }
        due
    }

    /// Number of pending events
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is scheduled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self::new()
    }
}
