//! Geometric primitives for page-coordinate reasoning.
//!
//! Rectangles are stored corner-to-corner in page units (PDF points). All of
//! the caption/region association logic works on these before anything is
//! converted to raster pixels.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page coordinates.
///
/// `(x0, y0)` is the top-left corner and `(x1, y1)` the bottom-right corner,
/// with y growing downward (render coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    #[serde(rename = "x1")]
    pub x0: f32,
    /// Top edge.
    #[serde(rename = "y1")]
    pub y0: f32,
    /// Right edge.
    #[serde(rename = "x2")]
    pub x1: f32,
    /// Bottom edge.
    #[serde(rename = "y2")]
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two corner points.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Area in page units squared.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// True if the rectangles share any area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }

    /// True if `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow every edge outward by `margin` page units.
    pub fn expanded(&self, margin: f32) -> Rect {
        Rect {
            x0: self.x0 - margin,
            y0: self.y0 - margin,
            x1: self.x1 + margin,
            y1: self.y1 + margin,
        }
    }

    /// Clamp this rectangle so it lies within `bounds`.
    pub fn clamped_to(&self, bounds: &Rect) -> Rect {
        Rect {
            x0: self.x0.max(bounds.x0),
            y0: self.y0.max(bounds.y0),
            x1: self.x1.min(bounds.x1),
            y1: self.y1.min(bounds.y1),
        }
    }

    /// Length of the horizontal overlap between the two rectangles' x-spans,
    /// zero when they do not overlap horizontally.
    pub fn horizontal_overlap(&self, other: &Rect) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Vertical distance between the two rectangles' y-spans; zero when the
    /// spans overlap.
    pub fn vertical_gap(&self, other: &Rect) -> f32 {
        if self.y1 <= other.y0 {
            other.y0 - self.y1
        } else if other.y1 <= self.y0 {
            self.y0 - other.y1
        } else {
            0.0
        }
    }

    /// Union of an iterator of rectangles, `None` when empty.
    pub fn union_all<I: IntoIterator<Item = Rect>>(rects: I) -> Option<Rect> {
        rects.into_iter().reduce(|a, b| a.union(&b))
    }
}
