//! Longitude wrapping between unwrapped view extents and the `[0, 360)` world.

use super::rect::{snap, WorldRect};

/// Width of one longitude period in degrees.
pub const PERIOD: f64 = 360.0;

/// One appearance of a wrapped rectangle inside an unwrapped extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occurrence {
    /// The rectangle shifted by a whole number of periods.
    pub shifted: WorldRect,
    /// Part of `shifted` that lies inside the extent.
    pub overlap: WorldRect,
}

/// Folds an unwrapped extent into non-overlapping rectangles inside `[0, 360)`.
///
/// An extent at least one period wide collapses to the full period.
pub fn wrap_world_rect(rect: &WorldRect) -> Vec<WorldRect> {
    if rect.is_empty() {
        return Vec::new();
    }
    if rect.width() >= PERIOD {
        return vec![WorldRect::from_bounds(0.0, rect.min_y, PERIOD, rect.max_y)];
    }

    let periods = (rect.min_x / PERIOD).floor();
    let mut min_x = snap(rect.min_x - periods * PERIOD);
    if min_x >= PERIOD {
        // Noise just below a period boundary snapped onto it.
        min_x -= PERIOD;
    }
    let max_x = min_x + rect.width();

    let pieces = if max_x <= PERIOD {
        vec![WorldRect::from_bounds(min_x, rect.min_y, max_x, rect.max_y)]
    } else {
        vec![
            WorldRect::from_bounds(min_x, rect.min_y, PERIOD, rect.max_y),
            WorldRect::from_bounds(0.0, rect.min_y, snap(max_x - PERIOD), rect.max_y),
        ]
    };
    pieces.into_iter().filter(|piece| !piece.is_empty()).collect()
}

/// Clips a rectangle in wrapped coordinates to the `[0, 360)` period.
///
/// Grid tiles in the last column can reach past 360 degrees; that part
/// duplicates longitudes the first column already serves.
pub fn clip_to_period(rect: &WorldRect) -> Option<WorldRect> {
    rect.intersection(&WorldRect::from_bounds(0.0, f64::MIN, PERIOD, f64::MAX))
}

/// Finds every whole-period shift of `rect` that overlaps `extent`.
///
/// A tile appears more than once when the extent spans more than one period.
pub fn unwrapped_occurrences(rect: &WorldRect, extent: &WorldRect) -> Vec<Occurrence> {
    if rect.is_empty() || extent.is_empty() {
        return Vec::new();
    }

    let first = ((extent.min_x - rect.max_x) / PERIOD).floor() as i64;
    let last = ((extent.max_x - rect.min_x) / PERIOD).ceil() as i64;

    (first..=last)
        .filter_map(|k| {
            let shifted = rect.translate(k as f64 * PERIOD, 0.0);
            shifted
                .intersection(extent)
                .map(|overlap| Occurrence { shifted, overlap })
        })
        .collect()
}
