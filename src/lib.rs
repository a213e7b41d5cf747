//! # mapgrid
//!
//! A tile grid cache and viewport synchronization engine for tiled map layers.
//!
//! Given a viewport (center, resolution, pixel size) a [`GridLayer`] keeps the
//! minimal matrix of live tiles covering it plus a buffer margin. Tiles are
//! recycled by shifting rows and columns as the view pans, loaded center-out
//! in a spiral, and bridged across resolution changes by back-buffers.

pub mod core;
pub mod layers;
pub mod prelude;
pub mod runtime;
pub mod tiles;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    config::{GridOptions, LoadingConfig, LoadingProfile, TransitionEffect},
    builder::MapBuilder,
    geo::{Pixel, Point, Size},
    map::{LayerEvent, Map, MapOptions},
    viewport::Viewport,
};

pub use layers::{
    base::LayerTrait,
    grid::{GridLayer, GridStats},
    manager::LayerManager,
};

pub use tiles::{
    content::{ImageContent, RequestContent, TileContent},
    loader::{HttpFetcher, TileFetcher, TileLoader},
    source::{TemplateSource, TileSource, XyzSource},
    tile::Tile,
    types::{GridEvent, LoadState, TileEvent, TileId, TilePayload},
};

pub use runtime::{AsyncHandle, AsyncSpawner, ManualSpawner};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = GridError;

/// Installs `env_logger` once; later calls are no-ops.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
