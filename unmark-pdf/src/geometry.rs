//! Axis-aligned rectangle math used throughout the crate.
//!
//! All coordinates are page points with a top-left origin: `(0, 0)` is the
//! top-left corner of the page, `x` grows right and `y` grows down. The
//! document layer converts to and from PDF user space (bottom-left origin) at
//! the boundary, so every rectangle seen by the detection and cleaning logic
//! lives in this one coordinate system.

/// An axis-aligned rectangle described by its top-left and bottom-right
/// corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl Rect {
    /// Creates a rectangle from its corner coordinates.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Creates a page rectangle anchored at the origin.
    pub fn page(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Returns `true` if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Returns `true` if the rectangles overlap or touch.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x0 > self.x1 || other.x1 < self.x0 || other.y0 > self.y1 || other.y1 < self.y0)
    }

    /// Returns `true` if the rectangles overlap with positive area.
    ///
    /// Unlike [`Rect::intersects`], rectangles that merely touch along an
    /// edge do not overlap. Redaction uses this test so content that exactly
    /// abuts a redaction rectangle is kept.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }

    /// Returns `true` if `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Grows the rectangle outward by `amount` on every side.
    pub fn padded(&self, amount: f64) -> Rect {
        Rect::new(
            self.x0 - amount,
            self.y0 - amount,
            self.x1 + amount,
            self.y1 + amount,
        )
    }

    /// Clamps every coordinate into `bounds`.
    ///
    /// A rectangle entirely outside `bounds` collapses onto the nearest edge
    /// and becomes empty; it never extends past the bounds.
    pub fn clamped_to(&self, bounds: &Rect) -> Rect {
        Rect::new(
            self.x0.clamp(bounds.x0, bounds.x1),
            self.y0.clamp(bounds.y0, bounds.y1),
            self.x1.clamp(bounds.x0, bounds.x1),
            self.y1.clamp(bounds.y0, bounds.y1),
        )
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Minimum Euclidean distance between the two rectangles.
    ///
    /// Zero when they overlap or touch; otherwise the length of the shortest
    /// segment connecting their boundaries.
    pub fn gap_distance(&self, other: &Rect) -> f64 {
        let dx = (self.x0 - other.x1).max(other.x0 - self.x1).max(0.0);
        let dy = (self.y0 - other.y1).max(other.y0 - self.y1).max(0.0);
        dx.hypot(dy)
    }
}
