//! Prelude module for common mapgrid types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapgrid::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{FailureIndicator, GridOptions, LoadingConfig, LoadingProfile, TransitionEffect},
    geo::{Frame, Pixel, Point, Size},
    builder::MapBuilder,
    map::{LayerEvent, Map, MapOptions},
    viewport::Viewport,
};

pub use crate::layers::{
    base::{LayerProperties, LayerTrait, LayerType},
    grid::{GridLayer, GridStats, TileGrid},
    manager::LayerManager,
};

pub use crate::tiles::{
    cache::TileCache,
    content::{ImageContent, RequestContent, TileContent},
    loader::{FetchResult, HttpFetcher, TileFetcher, TileLoader},
    source::{TemplateSource, TileSource, XyzSource},
    tile::Tile,
    types::{DrawItem, FetchTicket, GridEvent, LoadState, TileEvent, TileId, TilePayload},
};

pub use crate::runtime::{AsyncHandle, AsyncSpawner, ManualSpawner};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioSpawner;

pub use crate::{Error as GridError, Result};

pub use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{Arc, Mutex},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
