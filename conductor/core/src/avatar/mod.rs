//! Avatar State Machine
//!
//! Milo's visual state: the current mood (which picks the mouth shape), the
//! blink loop, and the wave gesture. The controller owns the avatar and is
//! the only writer; surfaces read [`Avatar::shapes`] and paint them.
//!
//! # Module Structure
//!
//! - [`shapes`]: flat 2-D drawing primitives (colors, bounds, shapes)
//! - [`blink`]: the endless randomized blink loop
//! - [`wave`]: the one-shot arm wave

pub mod blink;
pub mod shapes;
pub mod wave;

pub use blink::{BlinkCycle, BlinkTiming, BlinkTransition};
pub use shapes::{Bounds, Part, Rgb, Shape, ShapeKind};
pub use wave::{ArmPose, WaveAnimation, WaveEvent, WaveTiming};

use std::fmt;
use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Logical canvas width the geometry is laid out for
pub const CANVAS_WIDTH: u16 = 320;

/// Logical canvas height the geometry is laid out for
pub const CANVAS_HEIGHT: u16 = 220;

/// Avatar centre on the logical canvas
pub const CANVAS_CENTER: (i32, i32) = (160, 120);

const HEAD: Rgb = Rgb::from_hex(0x7ab8f0);
const HEAD_DARK: Rgb = Rgb::from_hex(0x26507a);
const BODY: Rgb = Rgb::from_hex(0xb8dcf6);
const BODY_DARK: Rgb = Rgb::from_hex(0x223357);
const ARM: Rgb = Rgb::from_hex(0x53a3d7);
const ARM_DARK: Rgb = Rgb::from_hex(0x132437);
const LEG: Rgb = Rgb::from_hex(0x377ce8);
const LEG_DARK: Rgb = Rgb::from_hex(0x202a45);
const HIGHLIGHT: Rgb = Rgb::from_hex(0xe3f2fc);

/// Avatar emotional moods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mood {
    /// Resting face
    #[default]
    Neutral,
    /// Big smile, shown when a reply lands
    Happy,
    /// Small pursed mouth while waiting for a reply
    Thinking,
}

impl Mood {
    /// Lowercase name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Thinking => "thinking",
        }
    }

    /// Mouth shape for this mood
    #[must_use]
    pub fn expression(self) -> Shape {
        match self {
            Self::Neutral => Shape {
                part: Part::Mouth,
                kind: SMILE,
                bounds: Bounds::new(-13, -22, 13, -10),
                fill: None,
                outline: Some(Rgb::from_hex(0x285B15)),
                width: 2,
            },
            Self::Happy => Shape {
                part: Part::Mouth,
                kind: SMILE,
                bounds: Bounds::new(-12, -25, 12, -9),
                fill: None,
                outline: Some(Rgb::from_hex(0x107C10)),
                width: 3,
            },
            Self::Thinking => Shape {
                part: Part::Mouth,
                kind: ShapeKind::Oval,
                bounds: Bounds::new(-4, -18, 4, -12),
                fill: Some(Rgb::from_hex(0xEBBD13)),
                outline: Some(Rgb::from_hex(0xBFA213)),
                width: 1,
            },
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const SMILE: ShapeKind = ShapeKind::Arc {
    start_deg: 200.0,
    extent_deg: 140.0,
};

/// Something visible changed during [`Avatar::tick`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvatarEvent {
    /// Eyes just closed
    EyesClosed,
    /// Eyes just reopened
    EyesOpened,
    /// The waving arm moved
    WaveFrame {
        /// Zero-based keyframe index
        index: usize,
        /// Pose applied
        pose: ArmPose,
    },
    /// The wave completed (emitted exactly once per wave)
    WaveFinished,
}

/// Milo's avatar
#[derive(Clone, Debug)]
pub struct Avatar {
    mood: Mood,
    arm: ArmPose,
    blink: BlinkCycle,
    wave: WaveAnimation,
}

impl Avatar {
    /// Create an avatar with a neutral face, eyes open and arm relaxed
    #[must_use]
    pub fn new(blink: BlinkTiming, wave: WaveTiming) -> Self {
        Self {
            mood: Mood::Neutral,
            arm: ArmPose::Relaxed,
            blink: BlinkCycle::new(blink),
            wave: WaveAnimation::new(wave),
        }
    }

    /// Current mood
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// Swap the mouth for the one matching `mood`
    ///
    /// Returns `false` if the avatar already shows that mood.
    pub fn set_expression(&mut self, mood: Mood) -> bool {
        if self.mood == mood {
            return false;
        }
        self.mood = mood;
        true
    }

    /// Whether the eyes are closed mid-blink
    #[must_use]
    pub fn eyes_closed(&self) -> bool {
        self.blink.is_closed()
    }

    /// Current left-arm pose
    #[must_use]
    pub fn arm_pose(&self) -> ArmPose {
        self.arm
    }

    /// Start the endless blink loop
    pub fn start_blinking<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        self.blink.start(now, rng);
    }

    /// Start a wave; ignored (returns `false`) while one is already running
    pub fn start_wave(&mut self, now: Instant) -> bool {
        let started = self.wave.start(now);
        if !started {
            tracing::debug!("wave already in progress, ignoring request");
        }
        started
    }

    /// Whether a wave is in flight
    #[must_use]
    pub fn is_waving(&self) -> bool {
        self.wave.is_running()
    }

    /// Earliest instant at which [`Avatar::tick`] has work to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.blink.next_deadline(), self.wave.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Advance blink and wave to `now`
    pub fn tick<R: Rng>(&mut self, now: Instant, rng: &mut R) -> Vec<AvatarEvent> {
        let mut events: Vec<AvatarEvent> = self
            .blink
            .advance(now, rng)
            .into_iter()
            .map(|t| match t {
                BlinkTransition::Closed(_) => AvatarEvent::EyesClosed,
                BlinkTransition::Opened(_) => AvatarEvent::EyesOpened,
            })
            .collect();

        for event in self.wave.advance(now) {
            match event {
                WaveEvent::Frame { index, pose, .. } => {
                    self.arm = pose;
                    events.push(AvatarEvent::WaveFrame { index, pose });
                }
                WaveEvent::Finished { .. } => events.push(AvatarEvent::WaveFinished),
            }
        }

        events
    }

    /// All shapes in paint order, relative to the avatar centre
    #[must_use]
    pub fn shapes(&self) -> Vec<Shape> {
        let pupil_fill = if self.eyes_closed() {
            Rgb::WHITE
        } else {
            Rgb::BLACK
        };
        let pupil = |part: Part, bounds: Bounds| Shape {
            part,
            kind: ShapeKind::Oval,
            bounds,
            fill: Some(pupil_fill),
            outline: Some(Rgb::BLACK),
            width: 1,
        };

        let head = Bounds::new(-40, -55, 40, -15);
        let body = Bounds::new(-25, -15, 25, 55);
        let left_arm = self.arm.bounds();
        let right_arm = Bounds::new(25, -12, 55, 6);
        let left_leg = Bounds::new(-18, 55, -6, 85);
        let right_leg = Bounds::new(6, 55, 18, 85);

        vec![
            Shape::flat(Part::HeadShadow, head.offset(4, 4), HEAD_DARK),
            Shape::boxed(Part::Head, head, HEAD, 2),
            Shape::flat(Part::HeadHighlight, Bounds::new(-30, -52, 10, -20), HIGHLIGHT),
            Shape::boxed(Part::LeftEye, Bounds::new(-27, -45, -12, -30), Rgb::WHITE, 2),
            pupil(Part::LeftPupil, Bounds::new(-24, -42, -15, -33)),
            Shape::boxed(Part::RightEye, Bounds::new(12, -45, 27, -30), Rgb::WHITE, 2),
            pupil(Part::RightPupil, Bounds::new(15, -42, 24, -33)),
            Shape::flat(Part::BodyShadow, body.offset(3, 3), BODY_DARK),
            Shape::boxed(Part::Body, body, BODY, 2),
            Shape::flat(Part::BodyHighlight, Bounds::new(-10, -8, 17, 7), HIGHLIGHT),
            Shape::flat(Part::LeftArmShadow, left_arm.offset(3, 3), ARM_DARK),
            Shape::boxed(Part::LeftArm, left_arm, ARM, 2),
            Shape::flat(Part::RightArmShadow, right_arm.offset(3, 3), ARM_DARK),
            Shape::boxed(Part::RightArm, right_arm, ARM, 2),
            Shape::flat(Part::LeftLegShadow, left_leg.offset(3, 3), LEG_DARK),
            Shape::boxed(Part::LeftLeg, left_leg, LEG, 2),
            Shape::flat(Part::RightLegShadow, right_leg.offset(3, 3), LEG_DARK),
            Shape::boxed(Part::RightLeg, right_leg, LEG, 2),
            self.mood.expression(),
        ]
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self::new(BlinkTiming::default(), WaveTiming::default())
    }
}
