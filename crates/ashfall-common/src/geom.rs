//! Screen-space rectangles for collision queries.
//!
//! Combat geometry is axis-aligned boxes in screen coordinates:
//! `x` grows rightward, `y` grows downward, so `top` is the smaller
//! `y` edge and `bottom` the larger one.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (minimum x)
    pub min_x: f32,
    /// Top edge (minimum y)
    pub min_y: f32,
    /// Right edge (maximum x)
    pub max_x: f32,
    /// Bottom edge (maximum y)
    pub max_y: f32,
}

impl Rect {
    /// Creates a rectangle from its edges.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub fn from_topleft(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    /// Creates a rectangle from its center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min_x: center.x - half_extents.x,
            min_y: center.y - half_extents.y,
            max_x: center.x + half_extents.x,
            max_y: center.y + half_extents.y,
        }
    }

    /// Left edge.
    #[must_use]
    pub const fn left(&self) -> f32 {
        self.min_x
    }

    /// Right edge.
    #[must_use]
    pub const fn right(&self) -> f32 {
        self.max_x
    }

    /// Top edge.
    #[must_use]
    pub const fn top(&self) -> f32 {
        self.min_y
    }

    /// Bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> f32 {
        self.max_y
    }

    /// Horizontal center.
    #[must_use]
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    /// Vertical center.
    #[must_use]
    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_x(), self.center_y())
    }

    /// Width of the rectangle.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Height of the rectangle.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// Checks overlap with another rectangle.
    ///
    /// Comparisons are strict, so rectangles that merely share an
    /// edge do not overlap and a zero-size rectangle overlaps
    /// nothing.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Returns this rectangle shifted by an offset.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}
