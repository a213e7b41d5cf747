use crate::{
    core::{
        constants::RATIO_EPSILON,
        geo::{Point, Size},
        viewport::Viewport,
    },
    layers::{base::LayerTrait, manager::LayerManager},
    tiles::types::{DrawItem, GridEvent},
    GridError, Result,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Finest resolution `zoom_to` will go to
    pub min_resolution: Option<f64>,
    /// Coarsest resolution `zoom_to` will go to
    pub max_resolution: Option<f64>,
}

impl MapOptions {
    pub fn validate(&self) -> Result<()> {
        for resolution in [self.min_resolution, self.max_resolution].into_iter().flatten() {
            if !(resolution > 0.0) || !resolution.is_finite() {
                return Err(GridError::InvalidConfig(format!(
                    "resolution limit must be positive, got {}",
                    resolution
                ))
                .into());
            }
        }
        if let (Some(min), Some(max)) = (self.min_resolution, self.max_resolution) {
            if min > max {
                return Err(GridError::InvalidConfig(format!(
                    "min resolution {} exceeds max resolution {}",
                    min, max
                ))
                .into());
            }
        }
        Ok(())
    }

    fn clamp(&self, resolution: f64) -> f64 {
        let resolution = self.min_resolution.map_or(resolution, |min| resolution.max(min));
        self.max_resolution.map_or(resolution, |max| resolution.min(max))
    }
}

fn same_resolution(a: f64, b: f64) -> bool {
    (a / b - 1.0).abs() <= RATIO_EPSILON
}

/// A notification from one of the map's layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEvent {
    pub layer_id: String,
    pub event: GridEvent,
}

/// Owns the viewport and the layers following it.
///
/// Every viewport change is pushed to all layers immediately; finished
/// fetches are picked up by [`Map::update`].
pub struct Map {
    viewport: Viewport,
    layers: LayerManager,
    options: MapOptions,
}

impl Map {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            layers: LayerManager::new(),
            options: MapOptions::default(),
        }
    }

    pub fn with_options(viewport: Viewport, options: MapOptions) -> Result<Self> {
        options.validate()?;
        let mut map = Self::new(viewport);
        let resolution = options.clamp(map.viewport.resolution);
        if !same_resolution(resolution, map.viewport.resolution) {
            map.viewport.set_resolution(resolution);
        }
        map.options = options;
        Ok(map)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerManager {
        &mut self.layers
    }

    /// Adds a layer and lays it out for the current viewport
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        self.layers.add_layer(layer)?;

        let viewport = &self.viewport;
        self.layers
            .with_layer_mut(&layer_id, |layer| layer.move_to(viewport, true, false))
            .unwrap_or(Ok(()))?;

        log::debug!("added layer {}", layer_id);
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        self.layers.remove_layer(layer_id)
    }

    /// Pans by a pixel delta; positive `dx` moves the view east, positive
    /// `dy` south
    pub fn pan_by(&mut self, dx: f64, dy: f64, dragging: bool) -> Result<()> {
        self.viewport.pan(Point::new(dx, dy));
        self.move_layers(false, dragging)
    }

    pub fn set_center(&mut self, center: Point, dragging: bool) -> Result<()> {
        self.viewport.set_center(center);
        self.move_layers(false, dragging)
    }

    /// Changes the resolution around the current center, clamped to the
    /// map's limits. Returns whether the resolution actually changed.
    pub fn zoom_to(&mut self, resolution: f64) -> Result<bool> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(GridError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                resolution
            ))
            .into());
        }

        let resolution = self.options.clamp(resolution);
        if same_resolution(resolution, self.viewport.resolution) {
            return Ok(false);
        }

        log::debug!("zoom {} -> {}", self.viewport.resolution, resolution);
        self.viewport.set_resolution(resolution);
        self.move_layers(true, false)?;
        Ok(true)
    }

    /// Changes the pixel size of the map and relays out every layer
    pub fn resize(&mut self, size: Size) -> Result<()> {
        self.viewport.set_size(size);
        self.viewport.reset_surface();

        let viewport = self.viewport.clone();
        self.layers
            .try_for_each_layer_mut(|layer| layer.on_map_resize(&viewport))?;
        self.move_layers(true, false)
    }

    /// Applies finished fetches on every layer; returns how many were taken
    pub fn update(&mut self) -> Result<usize> {
        let mut applied = 0;
        self.layers.try_for_each_layer_mut(|layer| {
            applied += layer.update()?;
            Ok(())
        })?;
        Ok(applied)
    }

    /// Collects the notifications every layer produced since the last call
    pub fn process_events(&mut self) -> Vec<LayerEvent> {
        let mut events = Vec::new();
        let _ = self.layers.try_for_each_layer_mut(|layer| {
            let layer_id = layer.id().to_string();
            events.extend(layer.drain_events().into_iter().map(|event| LayerEvent {
                layer_id: layer_id.clone(),
                event,
            }));
            Ok(())
        });
        events
    }

    pub fn is_loading(&self) -> bool {
        let mut loading = false;
        self.layers.for_each_layer(|layer| loading |= layer.is_loading());
        loading
    }

    /// Draw lists per layer, bottom layer first
    pub fn render(&self) -> Vec<(String, Vec<DrawItem>)> {
        self.layers.render(&self.viewport)
    }

    fn move_layers(&mut self, zoom_changed: bool, dragging: bool) -> Result<()> {
        let viewport = self.viewport.clone();
        self.layers
            .try_for_each_layer_mut(|layer| layer.move_to(&viewport, zoom_changed, dragging))
    }
}
