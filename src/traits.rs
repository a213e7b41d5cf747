//! Shared trait abstractions for common patterns
//!
//! Geometry helpers shared by the bounds types, and the operations every
//! layer exposes to the map driving it.

use crate::{
    core::{bounds::Bounds, viewport::Viewport},
    tiles::types::{DrawItem, GridEvent},
    Result,
};

/// Unified geometry operations trait to eliminate duplicate math implementations
pub trait GeometryOps<T> {
    /// Check if bounds contain a point
    fn contains_point(&self, point: &T) -> bool;

    /// Check if this bounds intersects with another
    fn intersects_bounds(&self, other: &Self) -> bool;

    /// Extend bounds to include a point
    fn extend_with_point(&mut self, point: &T);

    /// Get the center point
    fn center(&self) -> T;

    /// Check if bounds are valid
    fn is_valid(&self) -> bool;

    /// Get the area/size
    fn area(&self) -> f64;
}

/// Trait for layer-like objects
///
/// The map drives every layer through [`LayerOperations::move_to`] and
/// drains finished work with [`LayerOperations::update`].
pub trait LayerOperations: Send + Sync {
    /// Get layer ID
    fn id(&self) -> &str;

    /// Get layer name
    fn name(&self) -> &str;

    /// Get layer type
    fn layer_type(&self) -> crate::layers::base::LayerType;

    /// Check if layer is visible
    fn is_visible(&self) -> bool;

    /// Set layer visibility
    fn set_visible(&mut self, visible: bool);

    /// Get layer opacity (0.0 to 1.0)
    fn opacity(&self) -> f32;

    /// Set layer opacity
    fn set_opacity(&mut self, opacity: f32);

    /// Get layer z-index for ordering
    fn z_index(&self) -> i32;

    /// Set layer z-index
    fn set_z_index(&mut self, z_index: i32);

    /// Brings the layer in line with a new viewport. `zoom_changed` forces a
    /// full relayout; `dragging` marks an in-progress interactive pan.
    fn move_to(&mut self, viewport: &Viewport, zoom_changed: bool, dragging: bool) -> Result<()>;

    /// Called after the map's pixel size changed, before the forced relayout
    fn on_map_resize(&mut self, _viewport: &Viewport) -> Result<()> {
        Ok(())
    }

    /// Applies finished asynchronous work; returns how many results were taken
    fn update(&mut self) -> Result<usize> {
        Ok(0)
    }

    /// Takes the notifications produced since the last call
    fn drain_events(&mut self) -> Vec<GridEvent> {
        Vec::new()
    }

    /// Whether any tile of this layer is waiting on a fetch
    fn is_loading(&self) -> bool {
        false
    }

    /// What the layer would put on screen for `viewport`, back to front
    fn render(&self, viewport: &Viewport) -> Vec<DrawItem>;

    /// Get layer bounds if applicable
    fn bounds(&self) -> Option<Bounds> {
        None
    }

    /// Check if layer intersects with given bounds
    fn intersects_bounds(&self, bounds: &Bounds) -> bool {
        if let Some(layer_bounds) = self.bounds() {
            layer_bounds.intersects_bounds(bounds)
        } else {
            true
        }
    }

    /// Get layer options
    fn options(&self) -> serde_json::Value;

    /// Set layer options
    fn set_options(&mut self, options: serde_json::Value) -> Result<()>;

    /// Dynamic casting support
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
