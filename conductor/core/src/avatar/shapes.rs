//! Shape Primitives for the Avatar
//!
//! Milo is drawn from a fixed set of flat 2-D shapes (rectangles, ovals and
//! one arc for the mouth). Coordinates are logical canvas units relative to
//! the avatar centre, with `y` growing downwards. Surfaces scale and flip
//! them however their drawing backend needs.

use serde::{Deserialize, Serialize};

/// An RGB color
///
/// # Examples
///
/// ```
/// use milo_conductor::avatar::shapes::Rgb;
///
/// let head = Rgb::from_hex(0x7ab8f0);
/// assert_eq!(head, Rgb::new(0x7a, 0xb8, 0xf0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
}

impl Rgb {
    /// Create a color from components
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a `0xRRGGBB` literal
    #[must_use]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Pure black
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Pure white
    pub const WHITE: Self = Self::new(255, 255, 255);
}

/// Axis-aligned bounding box, `(x0, y0)` top-left to `(x1, y1)` bottom-right
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge
    pub x0: i32,
    /// Top edge
    pub y0: i32,
    /// Right edge
    pub x1: i32,
    /// Bottom edge
    pub y1: i32,
}

impl Bounds {
    /// Create bounds from two corners
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Same box moved by `(dx, dy)`
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }

    /// Width of the box
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    /// Height of the box
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    /// Centre point as floats
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x0 + self.x1) / 2.0,
            f64::from(self.y0 + self.y1) / 2.0,
        )
    }
}

/// Geometric kind of a shape
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Rectangle filling its bounds
    Rect,
    /// Ellipse inscribed in its bounds
    Oval,
    /// Open arc of the ellipse inscribed in its bounds
    Arc {
        /// Start angle in degrees, counter-clockwise from 3 o'clock
        start_deg: f64,
        /// Sweep in degrees, counter-clockwise
        extent_deg: f64,
    },
}

/// Named body parts, in paint order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Part {
    HeadShadow,
    Head,
    HeadHighlight,
    LeftEye,
    LeftPupil,
    RightEye,
    RightPupil,
    BodyShadow,
    Body,
    BodyHighlight,
    LeftArmShadow,
    LeftArm,
    RightArmShadow,
    RightArm,
    LeftLegShadow,
    LeftLeg,
    RightLegShadow,
    RightLeg,
    Mouth,
}

/// One drawable shape
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Which part of Milo this is
    pub part: Part,
    /// Geometry kind
    pub kind: ShapeKind,
    /// Bounding box relative to the avatar centre
    pub bounds: Bounds,
    /// Fill color (None = hollow)
    pub fill: Option<Rgb>,
    /// Outline color (None = no outline)
    pub outline: Option<Rgb>,
    /// Outline width in canvas units
    pub width: u8,
}

impl Shape {
    /// A filled rectangle with no outline
    #[must_use]
    pub const fn flat(part: Part, bounds: Bounds, fill: Rgb) -> Self {
        Self {
            part,
            kind: ShapeKind::Rect,
            bounds,
            fill: Some(fill),
            outline: None,
            width: 0,
        }
    }

    /// A filled rectangle with a black outline
    #[must_use]
    pub const fn boxed(part: Part, bounds: Bounds, fill: Rgb, width: u8) -> Self {
        Self {
            part,
            kind: ShapeKind::Rect,
            bounds,
            fill: Some(fill),
            outline: Some(Rgb::BLACK),
            width,
        }
    }

    /// Sample points along the outline of an oval or arc
    ///
    /// Points are in the same y-down coordinates as [`Shape::bounds`]. For
    /// rectangles this returns the four corners.
    #[must_use]
    pub fn outline_points(&self, samples: usize) -> Vec<(f64, f64)> {
        let (cx, cy) = self.bounds.center();
        let rx = f64::from(self.bounds.width()) / 2.0;
        let ry = f64::from(self.bounds.height()) / 2.0;
        let (start, extent) = match self.kind {
            ShapeKind::Rect => {
                let b = self.bounds;
                return vec![
                    (f64::from(b.x0), f64::from(b.y0)),
                    (f64::from(b.x1), f64::from(b.y0)),
                    (f64::from(b.x1), f64::from(b.y1)),
                    (f64::from(b.x0), f64::from(b.y1)),
                ];
            }
            ShapeKind::Oval => (0.0, 360.0),
            ShapeKind::Arc {
                start_deg,
                extent_deg,
            } => (start_deg, extent_deg),
        };

        let samples = samples.max(2);
        (0..samples)
            .map(|i| {
                let t = start + extent * (i as f64) / ((samples - 1) as f64);
                let rad = t.to_radians();
                // Angles run counter-clockwise on screen, so y is negated.
                (cx + rx * rad.cos(), cy - ry * rad.sin())
            })
            .collect()
    }
}
