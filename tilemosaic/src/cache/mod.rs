//! Tile cache: previously downloaded tiles and stale placeholders.
//!
//! [`TileCache`] is the synchronous store; [`CacheLayer`] adapts it to the
//! asynchronous, callback-per-tile contract the retriever expects.
//! Implementations:
//!
//! - [`DiskTileCache`]: one PNG per tile under a cache directory
//! - [`MemoryTileCache`]: in-process map
//! - [`NoOpTileCache`]: caches nothing

mod disk;
mod fuzzy;
mod layer;
mod maintenance;
mod memory;
mod path;
mod r#trait;
mod types;

pub use disk::DiskTileCache;
pub use fuzzy::{derive_fuzzy, MAX_FUZZY_FACTOR};
pub use layer::CacheLayer;
pub use maintenance::{clear_disk_cache, disk_cache_stats, ClearResult};
pub use memory::{MemoryCacheStats, MemoryTileCache};
pub use path::{cache_path, source_directory, TILE_EXTENSION};
pub use r#trait::{NoOpTileCache, TileCache};
pub use types::{CacheCheck, CacheError, CacheKey};
