//! LayerTrait implementation for GridLayer

use super::GridLayer;
use crate::{
    core::{bounds::Bounds, config::GridOptions, viewport::Viewport},
    layers::base::LayerTrait,
    tiles::types::{DrawItem, GridEvent},
    Result,
};

impl LayerTrait for GridLayer {
    crate::impl_layer_trait!(GridLayer, properties);

    fn move_to(&mut self, viewport: &Viewport, zoom_changed: bool, dragging: bool) -> Result<()> {
        GridLayer::move_to(self, viewport, zoom_changed, dragging)
    }

    fn on_map_resize(&mut self, _viewport: &Viewport) -> Result<()> {
        GridLayer::on_map_resize(self);
        Ok(())
    }

    fn update(&mut self) -> Result<usize> {
        self.process_completions()
    }

    fn drain_events(&mut self) -> Vec<GridEvent> {
        GridLayer::drain_events(self)
    }

    fn is_loading(&self) -> bool {
        self.loading_count() > 0
    }

    fn render(&self, viewport: &Viewport) -> Vec<DrawItem> {
        if !self.is_visible() {
            return Vec::new();
        }
        self.draw_list(viewport)
    }

    fn bounds(&self) -> Option<Bounds> {
        Some(self.ctx.options.max_extent)
    }

    fn options(&self) -> serde_json::Value {
        serde_json::to_value(&self.ctx.options).unwrap_or(serde_json::Value::Null)
    }

    fn set_options(&mut self, options: serde_json::Value) -> Result<()> {
        let options: GridOptions = serde_json::from_value(options).map_err(crate::GridError::from)?;
        self.set_grid_options(options)
    }
}
