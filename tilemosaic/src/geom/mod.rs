//! World-space geometry: rectangles, longitude wrapping and region sets.

mod rect;
mod region;
mod wrap;

pub use rect::{snap, WorldRect, SNAP_EPSILON};
pub use region::RegionSet;
pub use wrap::{clip_to_period, unwrapped_occurrences, wrap_world_rect, Occurrence, PERIOD};
