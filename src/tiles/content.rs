//! Pluggable tile payloads
//!
//! A [`Tile`](super::tile::Tile) owns exactly one [`TileContent`]. The grid
//! keeps a prototype per layer and stamps out fresh content for every new
//! tile with [`TileContent::clone_box`].

use crate::core::config::FailureIndicator;
use crate::prelude::Arc;
use crate::tiles::types::{FailureMarker, TilePayload};
use crate::{GridError, Result};

pub trait TileContent: Send + Sync + std::fmt::Debug {
    /// Short name of the content flavour, used in logs
    fn kind(&self) -> &'static str;

    /// A fetch for `locator` has been issued
    fn load(&mut self, locator: &str);

    /// The in-flight fetch was cancelled before it completed
    fn unload(&mut self);

    /// Takes the outcome of the fetch. Returns `false` when the tile ended up
    /// carrying a failure marker instead of usable content.
    fn finish(&mut self, result: Result<Arc<Vec<u8>>>, failure: &FailureIndicator) -> bool;

    /// Drops whatever is currently displayed
    fn clear(&mut self);

    fn payload(&self) -> Option<&TilePayload>;

    /// Whether this flavour can keep previous-resolution imagery on screen
    fn supports_back_buffer(&self) -> bool {
        false
    }

    /// Fresh, empty content of the same flavour
    fn clone_box(&self) -> Box<dyn TileContent>;
}

fn failure_payload(failure: &FailureIndicator, reason: String) -> TilePayload {
    TilePayload::Failed(FailureMarker {
        class_name: failure.class_name.clone(),
        error_tile_url: failure.error_tile_url.clone(),
        reason,
    })
}

/// Raster imagery for a single cell
#[derive(Debug, Clone, Default)]
pub struct ImageContent {
    pending: Option<String>,
    payload: Option<TilePayload>,
}

impl ImageContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator of the fetch currently in flight, if any
    pub fn pending_locator(&self) -> Option<&str> {
        self.pending.as_deref()
    }
}

/// Checks that the body is an image and returns its pixel size when known
fn inspect_image(data: &[u8]) -> Result<Option<(u32, u32)>> {
    if data.is_empty() {
        return Err(GridError::Decode("empty response body".to_string()).into());
    }

    #[cfg(feature = "decode")]
    {
        let image =
            image::load_from_memory(data).map_err(|e| GridError::Decode(e.to_string()))?;
        Ok(Some((image.width(), image.height())))
    }

    #[cfg(not(feature = "decode"))]
    {
        Ok(None)
    }
}

impl TileContent for ImageContent {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn load(&mut self, locator: &str) {
        self.pending = Some(locator.to_string());
    }

    fn unload(&mut self) {
        self.pending = None;
    }

    fn finish(&mut self, result: Result<Arc<Vec<u8>>>, failure: &FailureIndicator) -> bool {
        let locator = self.pending.take().unwrap_or_default();
        let outcome = result.and_then(|data| inspect_image(&data).map(|dims| (data, dims)));

        match outcome {
            Ok((data, dimensions)) => {
                self.payload = Some(TilePayload::Image { data, dimensions });
                true
            }
            Err(e) => {
                log::warn!("image tile {} failed: {}", locator, e);
                self.payload = Some(failure_payload(failure, e.to_string()));
                false
            }
        }
    }

    fn clear(&mut self) {
        self.payload = None;
    }

    fn payload(&self) -> Option<&TilePayload> {
        self.payload.as_ref()
    }

    fn supports_back_buffer(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn TileContent> {
        Box::new(ImageContent::new())
    }
}

/// A cell backed by a data sub-request (e.g. a feature query per tile).
/// The response body is kept as-is for a format parser downstream.
#[derive(Debug, Clone, Default)]
pub struct RequestContent {
    pending: Option<String>,
    payload: Option<TilePayload>,
}

impl RequestContent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileContent for RequestContent {
    fn kind(&self) -> &'static str {
        "request"
    }

    fn load(&mut self, locator: &str) {
        self.pending = Some(locator.to_string());
    }

    fn unload(&mut self) {
        self.pending = None;
    }

    fn finish(&mut self, result: Result<Arc<Vec<u8>>>, failure: &FailureIndicator) -> bool {
        let locator = self.pending.take().unwrap_or_default();
        match result {
            Ok(data) => {
                self.payload = Some(TilePayload::Features(data));
                true
            }
            Err(e) => {
                log::warn!("sub-request {} failed: {}", locator, e);
                self.payload = Some(failure_payload(failure, e.to_string()));
                false
            }
        }
    }

    fn clear(&mut self) {
        self.payload = None;
    }

    fn payload(&self) -> Option<&TilePayload> {
        self.payload.as_ref()
    }

    fn clone_box(&self) -> Box<dyn TileContent> {
        Box::new(RequestContent::new())
    }
}
