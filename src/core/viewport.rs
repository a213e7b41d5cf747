use crate::core::bounds::Bounds;
use crate::core::geo::{Pixel, Point, Size};
use crate::{GridError, Result};
use serde::{Deserialize, Serialize};

/// The current view of the map: center, resolution, and pixel size.
///
/// Besides the visible rectangle the viewport tracks the origin of the
/// moving layer surface. Tiles are positioned in layer pixels relative to
/// that origin, so a pan only moves the surface and leaves every tile's
/// position untouched. The origin is reset whenever the resolution changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the view in map units
    pub center: Point,
    /// Map units per pixel
    pub resolution: f64,
    /// The size of the viewport in pixels
    pub size: Size,
    /// Map coordinate of layer pixel (0, 0)
    layer_origin: Point,
}

impl Viewport {
    /// Creates a new viewport; the layer surface starts aligned with the view
    pub fn new(center: Point, resolution: f64, size: Size) -> Self {
        let mut viewport = Self {
            center,
            resolution,
            size,
            layer_origin: Point::default(),
        };
        viewport.reset_surface();
        viewport
    }

    /// Like [`Viewport::new`] but rejects non-positive resolutions
    pub fn try_new(center: Point, resolution: f64, size: Size) -> Result<Self> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(GridError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                resolution
            ))
            .into());
        }
        Ok(Self::new(center, resolution, size))
    }

    /// Gets the current viewport bounds in map units
    pub fn bounds(&self) -> Bounds {
        Bounds::from_center_and_size(
            self.center,
            self.size.w as f64 * self.resolution,
            self.size.h as f64 * self.resolution,
        )
    }

    /// Map coordinate anchoring layer pixel (0, 0)
    pub fn layer_origin(&self) -> Point {
        self.layer_origin
    }

    /// Pans the view by a pixel delta. Positive `dx` moves the view east,
    /// positive `dy` moves it south; the layer surface slides the other way.
    pub fn pan(&mut self, delta: Point) {
        self.center = Point::new(
            self.center.x + delta.x * self.resolution,
            self.center.y - delta.y * self.resolution,
        );
    }

    /// Recenters the view without changing the resolution
    pub fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    /// Changes the resolution around the current center and resets the
    /// layer surface
    pub fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
        self.reset_surface();
    }

    /// Sets the viewport size, keeping the center fixed
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Re-anchors the layer surface at the current top-left corner
    pub fn reset_surface(&mut self) {
        self.layer_origin = self.bounds().top_left();
    }

    /// Viewport pixel at which layer pixel (0, 0) currently sits
    pub fn surface_offset(&self) -> Point {
        let bounds = self.bounds();
        Point::new(
            (self.layer_origin.x - bounds.left) / self.resolution,
            (bounds.top - self.layer_origin.y) / self.resolution,
        )
    }

    /// Converts a map coordinate to fractional layer pixels
    pub fn layer_point_from_map(&self, point: &Point) -> Point {
        Point::new(
            (point.x - self.layer_origin.x) / self.resolution,
            (self.layer_origin.y - point.y) / self.resolution,
        )
    }

    /// Converts a map coordinate to the nearest layer pixel
    pub fn layer_pixel_from_map(&self, point: &Point) -> Pixel {
        self.layer_point_from_map(point).round()
    }

    /// Converts a viewport pixel to layer pixels
    pub fn layer_point_from_viewport(&self, point: &Point) -> Point {
        point.subtract(&self.surface_offset())
    }

    /// Converts a layer pixel to viewport pixels
    pub fn viewport_point_from_layer(&self, point: &Point) -> Point {
        point.add(&self.surface_offset())
    }

    /// Converts a viewport pixel to a map coordinate
    pub fn map_from_viewport(&self, point: &Point) -> Point {
        let bounds = self.bounds();
        Point::new(
            bounds.left + point.x * self.resolution,
            bounds.top - point.y * self.resolution,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), 1.0, Size::new(800, 600))
    }
}
