//! Back-buffers bridge a resolution change.
//!
//! A back-buffer is a hidden shadow of a primary tile. While the primary
//! reloads at a new resolution the shadow is stretched by the ratio between
//! the resolution its imagery was taken at and the live one, and shown in
//! its place. Once the primary has loaded (and nothing else on the layer is
//! still loading) the shadow takes over the primary's imagery and hides
//! again, ready for the next transition. A primary whose fetch failed never
//! refreshes its shadow, so the stale imagery stays up.

use crate::core::{
    bounds::Bounds,
    constants::RATIO_EPSILON,
    geo::{Frame, Pixel, Size},
    viewport::Viewport,
};
use crate::tiles::types::TilePayload;

#[derive(Debug, Clone)]
pub struct BackBuffer {
    bounds: Bounds,
    position: Pixel,
    size: Size,
    /// Resolution the held imagery was rendered at
    resolution: Option<f64>,
    payload: Option<TilePayload>,
    /// Where the shadow is drawn, in layer pixels
    frame: Frame,
    visible: bool,
    last_ratio: f64,
    first_draw: bool,
}

impl BackBuffer {
    /// An empty, hidden shadow of a primary at `bounds`/`position`
    pub fn new(bounds: Bounds, position: Pixel, size: Size) -> Self {
        Self {
            bounds,
            position,
            size,
            resolution: None,
            payload: None,
            frame: Frame::from_pixel(position, size),
            visible: false,
            last_ratio: 1.0,
            first_draw: true,
        }
    }

    /// Runs on every draw of the primary at `resolution`.
    ///
    /// When the resolution ratio moved since the last draw the shadow is
    /// rescaled around its own upper-left corner and shown. Otherwise it is
    /// shown only for single-tile layers.
    pub fn start_transition(&mut self, resolution: f64, viewport: &Viewport, single_tile: bool) {
        if self.payload.is_none() {
            return;
        }

        let ratio = self
            .resolution
            .map(|held| held / resolution)
            .unwrap_or(1.0);

        if (ratio - self.last_ratio).abs() > RATIO_EPSILON {
            let origin = viewport.layer_point_from_map(&self.bounds.top_left());
            self.frame = Frame::new(
                origin,
                self.size.w as f64 * ratio,
                self.size.h as f64 * ratio,
            );
            self.visible = true;
            log::trace!(
                "back-buffer rescaled by {:.3} at ({:.1}, {:.1})",
                ratio,
                origin.x,
                origin.y
            );
        } else {
            self.visible = single_tile;
        }

        self.last_ratio = ratio;
    }

    /// Whether a load-end of the primary should refresh this shadow
    pub fn wants_reset(&self, primary_failed: bool, none_loading: bool) -> bool {
        !primary_failed && (self.first_draw || none_loading)
    }

    /// Takes over the primary's freshly loaded imagery and hides
    pub fn reset_from(
        &mut self,
        bounds: Bounds,
        position: Pixel,
        size: Size,
        resolution: f64,
        payload: Option<TilePayload>,
        within_extent: bool,
    ) {
        self.first_draw = false;
        if within_extent {
            self.bounds = bounds;
            self.position = position;
            self.size = size;
            self.resolution = Some(resolution);
            self.payload = payload;
            self.frame = Frame::from_pixel(position, size);
        }
        self.visible = false;
    }

    /// Drops the held imagery
    pub fn clear(&mut self) {
        self.payload = None;
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.payload.is_some()
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn payload(&self) -> Option<&TilePayload> {
        self.payload.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }
}
