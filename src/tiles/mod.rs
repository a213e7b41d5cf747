pub mod back_buffer;
pub mod cache;
pub mod content;
pub mod loader;
pub mod source;
pub mod tile;
pub mod types;

// Re-exports for convenience
pub use back_buffer::BackBuffer;
pub use cache::TileCache;
pub use content::{ImageContent, RequestContent, TileContent};
pub use loader::{FetchResult, HttpFetcher, TileFetcher, TileLoader};
pub use source::{TemplateSource, TileSource, XyzSource};
pub use tile::{Tile, TileEnv};
pub use types::{DrawItem, FetchTicket, GridEvent, LoadState, TileEvent, TileId, TilePayload};
