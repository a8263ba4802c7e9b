//! Tile grid coordinates.

use std::fmt;

/// Grid coordinates of one tile within a resolution level.
///
/// `x` counts tile columns east from longitude 0 and `y` counts tile rows
/// north from latitude -90. Columns are always folded into `[0, 360)`, so
/// the same key can appear at several places in an unwrapped view.
///
/// # Example
///
/// ```
/// use tilemosaic::tile::TileKey;
///
/// let key = TileKey::new(3, 1);
/// assert_eq!(key.x(), 3);
/// assert_eq!(key.y(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    x: i32,
    y: i32,
}

impl TileKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile column.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Tile row.
    pub fn y(&self) -> i32 {
        self.y
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
