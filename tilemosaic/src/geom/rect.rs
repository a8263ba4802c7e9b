//! Axis-aligned rectangles in world coordinates (degrees).

use std::fmt;

/// Tolerance used when snapping world coordinates onto the pixel grid.
pub const SNAP_EPSILON: f64 = 1e-9;

/// Axis-aligned rectangle in world coordinates.
///
/// `x` grows east (longitude, may leave `[0, 360)` for unwrapped views) and
/// `y` grows north (latitude). A rectangle with zero or negative width or
/// height is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldRect {
    /// Creates a rectangle from its origin and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    /// Creates a rectangle from its bounds.
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// True when the rectangle covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.max_x > self.min_x && self.max_y > self.min_y)
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Returns the overlap of two rectangles, or `None` when they share no area.
    pub fn intersection(&self, other: &WorldRect) -> Option<WorldRect> {
        let r = WorldRect::from_bounds(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        (!r.is_empty()).then_some(r)
    }

    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.intersection(other).is_some()
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &WorldRect) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    pub fn translate(&self, dx: f64, dy: f64) -> WorldRect {
        WorldRect::from_bounds(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Returns the parts of `self` not covered by `other`.
    ///
    /// The result holds at most four disjoint rectangles: full-width bands
    /// below and above the overlap, then left and right pieces beside it.
    /// No new coordinates are computed, so pieces tile exactly.
    pub fn subtract(&self, other: &WorldRect) -> Vec<WorldRect> {
        let Some(overlap) = self.intersection(other) else {
            return if self.is_empty() { Vec::new() } else { vec![*self] };
        };

        let mut pieces = Vec::with_capacity(4);
        let candidates = [
            WorldRect::from_bounds(self.min_x, self.min_y, self.max_x, overlap.min_y),
            WorldRect::from_bounds(self.min_x, overlap.max_y, self.max_x, self.max_y),
            WorldRect::from_bounds(self.min_x, overlap.min_y, overlap.min_x, overlap.max_y),
            WorldRect::from_bounds(overlap.max_x, overlap.min_y, self.max_x, overlap.max_y),
        ];
        for piece in candidates {
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }
        pieces
    }
}

impl fmt::Display for WorldRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Snaps a value to the nearest integer when it is within floating-point
/// noise of it.
#[inline]
pub fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAP_EPSILON {
        rounded
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_origin_and_size() {
        let r = WorldRect::new(0.0, -90.0, 360.0, 180.0);
        assert_eq!(r.max_x, 360.0);
        assert_eq!(r.max_y, 90.0);
        assert_eq!(r.area(), 360.0 * 180.0);
    }

    #[test]
    fn test_intersection_of_touching_rects_is_none() {
        let a = WorldRect::new(0.0, 0.0, 10.0, 10.0);
        let b = WorldRect::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_intersection_overlap() {
        let a = WorldRect::new(0.0, 0.0, 10.0, 10.0);
        let b = WorldRect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(
            a.intersection(&b),
            Some(WorldRect::from_bounds(5.0, 5.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_subtract_hole_leaves_four_pieces() {
        let outer = WorldRect::new(0.0, 0.0, 10.0, 10.0);
        let hole = WorldRect::new(4.0, 4.0, 2.0, 2.0);
        let pieces = outer.subtract(&hole);
        assert_eq!(pieces.len(), 4);
        let area: f64 = pieces.iter().map(WorldRect::area).sum();
        assert_eq!(area, 100.0 - 4.0);
        for p in &pieces {
            assert!(p.intersection(&hole).is_none());
        }
    }

    #[test]
    fn test_subtract_disjoint_returns_self() {
        let a = WorldRect::new(0.0, 0.0, 1.0, 1.0);
        let b = WorldRect::new(5.0, 5.0, 1.0, 1.0);
        assert_eq!(a.subtract(&b), vec![a]);
    }

    #[test]
    fn test_subtract_covering_returns_nothing() {
        let a = WorldRect::new(1.0, 1.0, 1.0, 1.0);
        let b = WorldRect::new(0.0, 0.0, 5.0, 5.0);
        assert!(a.subtract(&b).is_empty());
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap(2.0000000000001), 2.0);
        assert_eq!(snap(1.9999999999999), 2.0);
        assert_eq!(snap(2.5), 2.5);
    }
}
