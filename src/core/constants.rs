//! Engine-wide defaults for the tile grid.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Extra rows/columns kept beyond each viewport edge.
pub const DEFAULT_BUFFER: u32 = 1;

/// Single-tile layers request an image this many times the viewport size.
pub const DEFAULT_SINGLE_TILE_RATIO: f64 = 1.5;

/// Default number of fetched payloads kept in the in-memory cache.
pub const DEFAULT_CACHE_SIZE: usize = 512;

/// Default number of fetches allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Resolution ratios closer to 1 than this are treated as unchanged, both
/// for zooming and for rescaling back-buffers.
pub const RATIO_EPSILON: f64 = 1e-9;
