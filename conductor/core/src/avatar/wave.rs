//! Wave Animation
//!
//! A one-shot gesture: the left arm alternates between a raised and a lowered
//! keyframe at a fixed cadence, ends on the resting keyframe, and reports
//! completion exactly once.
//!
//! A wave requested while another is still running is ignored; the running
//! wave finishes normally.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::shapes::Bounds;

/// Left-arm keyframes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmPose {
    /// Initial pose before the first wave
    Relaxed,
    /// Arm lifted above the shoulder
    Raised,
    /// Arm level with the shoulder (also the resting keyframe)
    Lowered,
}

impl ArmPose {
    /// Keyframes alternated during a wave
    pub const KEYFRAMES: [ArmPose; 2] = [ArmPose::Raised, ArmPose::Lowered];

    /// Pose the arm settles in after a wave
    pub const REST: ArmPose = ArmPose::Lowered;

    /// Arm bounds relative to the avatar centre
    #[must_use]
    pub const fn bounds(self) -> Bounds {
        match self {
            Self::Relaxed => Bounds::new(-55, -12, -25, 6),
            Self::Raised => Bounds::new(-60, -28, -25, -8),
            Self::Lowered => Bounds::new(-60, -12, -25, 6),
        }
    }
}

/// Wave timing parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveTiming {
    /// Time between two keyframes
    pub cadence: Duration,
    /// Number of keyframe transitions, including the final resting one
    pub steps: usize,
}

impl Default for WaveTiming {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(150),
            steps: 8,
        }
    }
}

/// Progress reported by [`WaveAnimation::advance`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveEvent {
    /// The arm moved to a keyframe
    Frame {
        /// Zero-based transition index
        index: usize,
        /// Pose applied
        pose: ArmPose,
        /// When the transition was due
        at: Instant,
    },
    /// The wave ended; fires once, right after the last frame
    Finished {
        /// When the wave ended
        at: Instant,
    },
}

#[derive(Clone, Copy, Debug)]
struct WaveRun {
    next_index: usize,
    next_at: Instant,
}

/// One-shot wave gesture
#[derive(Clone, Debug)]
pub struct WaveAnimation {
    timing: WaveTiming,
    run: Option<WaveRun>,
}

impl WaveAnimation {
    /// Create an idle animation
    #[must_use]
    pub fn new(mut timing: WaveTiming) -> Self {
        timing.steps = timing.steps.max(1);
        Self { timing, run: None }
    }

    /// Begin waving; the first keyframe is due at `now`
    ///
    /// Returns `false` (and changes nothing) if a wave is already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.run.is_some() {
            return false;
        }
        self.run = Some(WaveRun {
            next_index: 0,
            next_at: now,
        });
        true
    }

    /// Whether a wave is in flight
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// When the next keyframe is due
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.run.map(|run| run.next_at)
    }

    /// Emit every keyframe due at or before `now`
    pub fn advance(&mut self, now: Instant) -> Vec<WaveEvent> {
        let mut events = Vec::new();

        while let Some(mut run) = self.run {
            if run.next_at > now {
                break;
            }

            let index = run.next_index;
            let at = run.next_at;
            if index + 1 >= self.timing.steps {
                events.push(WaveEvent::Frame {
                    index,
                    pose: ArmPose::REST,
                    at,
                });
                events.push(WaveEvent::Finished { at });
                self.run = None;
                break;
            }

            events.push(WaveEvent::Frame {
                index,
                pose: ArmPose::KEYFRAMES[index % ArmPose::KEYFRAMES.len()],
                at,
            });
            run.next_index += 1;
            run.next_at += self.timing.cadence;
            self.run = Some(run);
        }

        events
    }
}
