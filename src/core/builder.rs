//! Map builder for fluent API configuration
//!
//! Collects the viewport, resolution limits and initial layers, then
//! builds a [`Map`] with every layer already laid out.

use crate::{
    core::{
        geo::{Point, Size},
        map::{Map, MapOptions},
        viewport::Viewport,
    },
    layers::base::LayerTrait,
    GridError, Result,
};

/// Builder for creating and configuring Map instances
pub struct MapBuilder {
    /// Initial viewport configuration
    viewport: Option<Viewport>,
    map_options: MapOptions,
    layers: Vec<Box<dyn LayerTrait>>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            viewport: None,
            map_options: MapOptions::default(),
            layers: Vec::new(),
        }
    }

    /// Set the initial viewport (center, resolution, and size)
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_view(self, center: Point, resolution: f64, size: Size) -> Self {
        self.with_viewport(Viewport::new(center, resolution, size))
    }

    pub fn with_resolution_limits(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.map_options.min_resolution = min;
        self.map_options.max_resolution = max;
        self
    }

    pub fn with_map_options(mut self, options: MapOptions) -> Self {
        self.map_options = options;
        self
    }

    /// Queues a layer; layers are added in order when the map is built
    pub fn with_layer(mut self, layer: Box<dyn LayerTrait>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Build the map with the configured options
    pub fn build(self) -> Result<Map> {
        let viewport = self
            .viewport
            .ok_or_else(|| GridError::InvalidConfig("no viewport specified".to_string()))?;
        if !(viewport.resolution > 0.0) || !viewport.resolution.is_finite() {
            return Err(GridError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                viewport.resolution
            ))
            .into());
        }

        let mut map = Map::with_options(viewport, self.map_options)?;
        for layer in self.layers {
            map.add_layer(layer)?;
        }
        Ok(map)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}
