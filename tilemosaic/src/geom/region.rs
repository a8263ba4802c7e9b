//! Rectangle-set regions for finished/fuzzy area bookkeeping.

use super::rect::WorldRect;

/// A region of world space stored as a list of pairwise-disjoint rectangles.
///
/// Insertion subtracts the existing rectangles from the new one before
/// storing the remainder, so the stored pieces never overlap and adding the
/// same rectangle twice leaves the region unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSet {
    rects: Vec<WorldRect>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a region covering a single rectangle.
    pub fn from_rect(rect: WorldRect) -> Self {
        let mut region = Self::new();
        region.add(rect);
        region
    }

    /// The disjoint rectangles making up this region.
    pub fn rects(&self) -> &[WorldRect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Total covered area in square degrees.
    pub fn area(&self) -> f64 {
        self.rects.iter().map(WorldRect::area).sum()
    }

    /// Adds a rectangle to the region (set union).
    pub fn add(&mut self, rect: WorldRect) {
        if rect.is_empty() {
            return;
        }

        let mut fresh = vec![rect];
        for existing in &self.rects {
            if fresh.is_empty() {
                return;
            }
            fresh = fresh
                .into_iter()
                .flat_map(|piece| piece.subtract(existing))
                .collect();
        }
        self.rects.extend(fresh);
    }

    /// Adds every rectangle of another region.
    pub fn union(&mut self, other: &RegionSet) {
        for rect in &other.rects {
            self.add(*rect);
        }
    }

    /// Removes a rectangle from the region (set difference).
    pub fn subtract(&mut self, rect: &WorldRect) {
        if rect.is_empty() {
            return;
        }
        self.rects = self
            .rects
            .iter()
            .flat_map(|existing| existing.subtract(rect))
            .collect();
    }

    /// Removes every rectangle of another region.
    pub fn difference(&mut self, other: &RegionSet) {
        for rect in &other.rects {
            self.subtract(rect);
        }
    }

    /// Returns the part of this region inside `rect`.
    pub fn intersection(&self, rect: &WorldRect) -> RegionSet {
        RegionSet {
            rects: self
                .rects
                .iter()
                .filter_map(|existing| existing.intersection(rect))
                .collect(),
        }
    }

    /// True when `rect` is entirely covered by this region.
    pub fn covers(&self, rect: &WorldRect) -> bool {
        let mut uncovered = RegionSet::from_rect(*rect);
        uncovered.difference(self);
        uncovered.is_empty()
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    /// Smallest rectangle enclosing the region, if any.
    pub fn bounds(&self) -> Option<WorldRect> {
        let first = *self.rects.first()?;
        Some(self.rects.iter().skip(1).fold(first, |acc, r| {
            WorldRect::from_bounds(
                acc.min_x.min(r.min_x),
                acc.min_y.min(r.min_y),
                acc.max_x.max(r.max_x),
                acc.max_y.max(r.max_y),
            )
        }))
    }
}
