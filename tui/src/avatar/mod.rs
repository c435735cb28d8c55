//! Avatar Rendering
//!
//! Paints Milo's shapes onto a ratatui [`Canvas`]. The geometry comes from
//! the controller's [`milo_conductor::Avatar`]; this module only turns it
//! into line segments on a 320x220 logical canvas.
//!
//! Shape coordinates are y-down and relative to the avatar centre, while the
//! canvas is y-up with its origin bottom-left, so every point is shifted and
//! flipped on the way through.

use milo_conductor::avatar::{Shape, ShapeKind, CANVAS_CENTER, CANVAS_HEIGHT, CANVAS_WIDTH};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line};
use ratatui::widgets::{Block, Widget};

use crate::theme;

/// Vertical distance between fill scanlines, in canvas units
const FILL_STEP: f64 = 1.0;

/// Points sampled along each oval or arc outline
const OUTLINE_SAMPLES: usize = 48;

/// One straight line in canvas coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Start x
    pub x1: f64,
    /// Start y
    pub y1: f64,
    /// End x
    pub x2: f64,
    /// End y
    pub y2: f64,
    /// Line color
    pub color: Color,
}

/// Map a shape-space point onto the canvas
#[must_use]
pub fn to_canvas(x: f64, y: f64) -> (f64, f64) {
    let (cx, cy) = CANVAS_CENTER;
    (
        f64::from(cx) + x,
        f64::from(CANVAS_HEIGHT) - (f64::from(cy) + y),
    )
}

/// Horizontal scanlines covering a filled shape
///
/// Arcs and hollow shapes produce nothing.
#[must_use]
pub fn fill_segments(shape: &Shape, step: f64) -> Vec<Segment> {
    let Some(fill) = shape.fill else {
        return Vec::new();
    };
    let color = theme::color(fill);
    let b = shape.bounds;
    let (cx, cy) = b.center();
    let rx = f64::from(b.width()) / 2.0;
    let ry = f64::from(b.height()) / 2.0;

    let mut segments = Vec::new();
    let mut y = f64::from(b.y0);
    while y <= f64::from(b.y1) {
        let span = match shape.kind {
            ShapeKind::Rect => Some((f64::from(b.x0), f64::from(b.x1))),
            ShapeKind::Oval if ry > 0.0 => {
                let t = (y - cy) / ry;
                let half = rx * (1.0 - t * t).max(0.0).sqrt();
                Some((cx - half, cx + half))
            }
            ShapeKind::Oval | ShapeKind::Arc { .. } => None,
        };
        if let Some((left, right)) = span {
            let (x1, y1) = to_canvas(left, y);
            let (x2, y2) = to_canvas(right, y);
            segments.push(Segment {
                x1,
                y1,
                x2,
                y2,
                color,
            });
        }
        y += step;
    }
    segments
}

/// Outline of a shape as connected segments
#[must_use]
pub fn outline_segments(shape: &Shape) -> Vec<Segment> {
    let Some(outline) = shape.outline else {
        return Vec::new();
    };
    let color = theme::color(outline);
    let mut points = shape.outline_points(OUTLINE_SAMPLES);
    if matches!(shape.kind, ShapeKind::Rect) {
        // Close the box.
        if let Some(&first) = points.first() {
            points.push(first);
        }
    }

    points
        .windows(2)
        .map(|pair| {
            let (x1, y1) = to_canvas(pair[0].0, pair[0].1);
            let (x2, y2) = to_canvas(pair[1].0, pair[1].1);
            Segment {
                x1,
                y1,
                x2,
                y2,
                color,
            }
        })
        .collect()
}

/// Widget that paints a list of avatar shapes in order
pub struct AvatarCanvas<'a> {
    shapes: &'a [Shape],
    block: Option<Block<'a>>,
}

impl<'a> AvatarCanvas<'a> {
    /// Paint these shapes, first to last
    #[must_use]
    pub fn new(shapes: &'a [Shape]) -> Self {
        Self {
            shapes,
            block: None,
        }
    }

    /// Surround the canvas with a block
    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for AvatarCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let shapes = self.shapes;
        let mut canvas = Canvas::default()
            .background_color(theme::CANVAS)
            .marker(Marker::Braille)
            .x_bounds([0.0, f64::from(CANVAS_WIDTH)])
            .y_bounds([0.0, f64::from(CANVAS_HEIGHT)])
            .paint(move |ctx| {
                for shape in shapes {
                    for seg in fill_segments(shape, FILL_STEP)
                        .into_iter()
                        .chain(outline_segments(shape))
                    {
                        ctx.draw(&Line::new(seg.x1, seg.y1, seg.x2, seg.y2, seg.color));
                    }
                    ctx.layer();
                }
            });
        if let Some(block) = self.block {
            canvas = canvas.block(block);
        }
        canvas.render(area, buf);
    }
}
