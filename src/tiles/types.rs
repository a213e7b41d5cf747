//! Core data types shared by tiles, the grid and its collaborators

use crate::core::geo::Frame;
use crate::prelude::Arc;
use serde::{Deserialize, Serialize};

/// Stable identity of a tile object for as long as the grid keeps it alive.
/// Ids are never reused, so a recycled tile keeps its id across moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tile-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadState {
    /// Created but never drawn
    Idle,
    /// A fetch is in flight
    Loading,
    /// The last fetch completed, successfully or not
    Loaded,
    /// The in-flight fetch was cancelled, or loaded content was cleared
    Unloaded,
    /// The cell lies outside the layer's maximum extent and was not requested
    NotDrawn,
}

impl LoadState {
    /// Anything but `Loading`: no fetch will complete for this tile
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Loading)
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Loaded => write!(f, "loaded"),
            LoadState::Unloaded => write!(f, "unloaded"),
            LoadState::NotDrawn => write!(f, "not-drawn"),
        }
    }
}

/// Lifecycle notifications emitted by a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEvent {
    LoadStart,
    /// Drawn again while a fetch was still in flight
    Reload,
    LoadEnd { failed: bool },
    Unload,
}

/// Notifications published by a grid layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    /// The number of loading tiles went from zero to non-zero
    LoadStart,
    /// The number of loading tiles dropped back to zero
    AllLoaded,
    Tile { tile: TileId, event: TileEvent },
}

/// Stamp identifying one issued fetch. Every fetch gets a fresh generation,
/// so a ticket only matches the tile's current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub tile: TileId,
    pub generation: u64,
}

/// Marks a cell whose fetch failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMarker {
    pub class_name: String,
    pub error_tile_url: Option<String>,
    pub reason: String,
}

/// What a finished tile holds for rendering
#[derive(Debug, Clone, PartialEq)]
pub enum TilePayload {
    /// Encoded raster imagery, with its pixel size when it was decoded
    Image {
        data: Arc<Vec<u8>>,
        dimensions: Option<(u32, u32)>,
    },
    /// Raw response of a vector sub-request, handed to a format parser
    Features(Arc<Vec<u8>>),
    Failed(FailureMarker),
}

impl TilePayload {
    pub fn is_failure(&self) -> bool {
        matches!(self, TilePayload::Failed(_))
    }
}

/// One entry of a layer's draw list
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub tile: TileId,
    /// Screen rectangle in viewport pixels
    pub frame: Frame,
    pub payload: TilePayload,
    /// Previous-resolution imagery shown while the tile reloads
    pub back_buffer: bool,
    pub opacity: f32,
}
