//! Core GridLayer implementation

use super::{
    layout::{plan_grid, tile_bounds_at},
    matrix::TileGrid,
    scheduler::{load_edge, spiral_walk, LoadAccounting},
};
use crate::{
    core::{
        bounds::Bounds,
        config::GridOptions,
        geo::Point,
        viewport::Viewport,
    },
    layers::base::{LayerProperties, LayerType},
    prelude::Arc,
    runtime::{self, AsyncSpawner},
    tiles::{
        cache::TileCache,
        content::{ImageContent, TileContent},
        loader::{HttpFetcher, TileFetcher, TileLoader},
        source::TileSource,
        tile::{Tile, TileEnv},
        types::{DrawItem, GridEvent, TileEvent, TileId},
    },
    GridError, Result,
};

/// How the grid has followed the viewport so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridStats {
    pub relayouts: u64,
    pub row_shifts: u64,
    pub column_shifts: u64,
    pub single_tile_draws: u64,
    /// Completions dropped because their tile had moved on
    pub stale_completions: u64,
}

/// Everything a tile transition borrows from its layer
pub(crate) struct LoadContext {
    pub(crate) options: GridOptions,
    pub(crate) source: Arc<dyn TileSource>,
    pub(crate) loader: TileLoader,
    pub(crate) generation: u64,
    pub(crate) events: Vec<(TileId, TileEvent)>,
}

impl LoadContext {
    fn env<'a>(&'a mut self, viewport: &'a Viewport) -> TileEnv<'a> {
        TileEnv {
            options: &self.options,
            source: self.source.as_ref(),
            loader: &mut self.loader,
            viewport,
            generation: &mut self.generation,
            events: &mut self.events,
        }
    }
}

/// A layer of imagery cut into a grid of tiles, or drawn as one oversized
/// tile in single-tile mode.
///
/// The layer is driven synchronously: [`GridLayer::move_to`] after every
/// viewport change, [`GridLayer::process_completions`] whenever fetches may
/// have finished. Notifications accumulate until
/// [`GridLayer::drain_events`].
pub struct GridLayer {
    pub(crate) properties: LayerProperties,
    pub(crate) ctx: LoadContext,
    pub(crate) prototype: Box<dyn TileContent>,
    pub(crate) grid: TileGrid,
    pub(crate) accounting: LoadAccounting,
    pub(crate) events: Vec<GridEvent>,
    pub(crate) viewport: Option<Viewport>,
    pub(crate) stats: GridStats,
}

impl GridLayer {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source: Arc<dyn TileSource>,
        fetcher: Arc<dyn TileFetcher>,
        spawner: Arc<dyn AsyncSpawner>,
        options: GridOptions,
    ) -> Result<Self> {
        options.validate()?;

        let loader = TileLoader::new(fetcher, spawner, &options.loading);
        let properties = LayerProperties::new(id.into(), name.into(), layer_type_for(&options));

        Ok(Self {
            properties,
            ctx: LoadContext {
                options,
                source,
                loader,
                generation: 0,
                events: Vec::new(),
            },
            prototype: Box::new(ImageContent::new()),
            grid: TileGrid::new(),
            accounting: LoadAccounting::new(),
            events: Vec::new(),
            viewport: None,
            stats: GridStats::default(),
        })
    }

    /// A layer fetching over HTTP on the global runtime
    pub fn with_http(
        id: impl Into<String>,
        name: impl Into<String>,
        source: Arc<dyn TileSource>,
        options: GridOptions,
    ) -> Result<Self> {
        Self::new(
            id,
            name,
            source,
            Arc::new(HttpFetcher::default()),
            runtime::runtime()?,
            options,
        )
    }

    /// Content kind cloned into every new tile
    pub fn with_content(mut self, prototype: Box<dyn TileContent>) -> Self {
        self.prototype = prototype;
        self
    }

    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.ctx.loader.set_cache(cache);
        self
    }

    pub fn grid_options(&self) -> &GridOptions {
        &self.ctx.options
    }

    /// Replaces the layer options. The grid is cleared; the next
    /// [`GridLayer::move_to`] rebuilds it with the new settings.
    pub fn set_grid_options(&mut self, options: GridOptions) -> Result<()> {
        options.validate()?;
        self.clear_grid();
        self.ctx.loader.set_config(&options.loading);
        self.properties.layer_type = layer_type_for(&options);
        self.ctx.options = options;
        Ok(())
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.grid.get(id)
    }

    pub fn stats(&self) -> GridStats {
        self.stats
    }

    /// Tiles the layer believes are loading
    pub fn loading_count(&self) -> usize {
        self.accounting.loading()
    }

    pub fn cache(&self) -> &TileCache {
        self.ctx.loader.cache()
    }

    /// The viewport of the last [`GridLayer::move_to`]
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Union of the live tiles' bounds
    pub fn tiles_bounds(&self) -> Option<Bounds> {
        self.grid.tiles_bounds()
    }

    /// Bounds of the cell under viewport pixel `px`. In single-tile mode
    /// that is the single tile, if there is one.
    pub fn tile_bounds_at(&self, px: Point) -> Option<Bounds> {
        if self.ctx.options.single_tile {
            return self.grid.tiles_bounds();
        }
        let viewport = self.viewport.as_ref()?;
        Some(tile_bounds_at(
            &viewport.map_from_viewport(&px),
            &self.ctx.options.max_extent,
            viewport.resolution,
            self.ctx.options.tile_size,
        ))
    }

    /// Follows a viewport change.
    ///
    /// A resolution change, an empty grid, or a jump that leaves no overlap
    /// with the current tiles rebuilds the matrix from scratch. Anything
    /// else recycles edge rows and columns until the top-left tile is back
    /// within the buffer band.
    pub fn move_to(&mut self, viewport: &Viewport, zoom_changed: bool, dragging: bool) -> Result<()> {
        if !(viewport.resolution > 0.0) || !viewport.resolution.is_finite() {
            return Err(GridError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                viewport.resolution
            ))
            .into());
        }

        let before = self.accounting.loading();
        self.viewport = Some(viewport.clone());

        let bounds = viewport.bounds();
        let force = self.grid.is_empty() || zoom_changed;
        let tiles_bounds = self.grid.tiles_bounds();

        if self.ctx.options.single_tile {
            let covered = tiles_bounds.map_or(false, |tb| tb.contains_bounds(&bounds, false, true));
            if force || (!dragging && !covered) {
                self.init_single_tile(viewport);
            }
        } else {
            let overlaps = tiles_bounds.map_or(false, |tb| tb.contains_bounds(&bounds, true, true));
            if force || !overlaps {
                self.init_gridded_tiles(viewport);
            } else {
                self.move_gridded_tiles(viewport);
            }
        }

        self.flush(before, None);
        Ok(())
    }

    fn init_single_tile(&mut self, viewport: &Viewport) {
        let size = self.ctx.options.effective_tile_size(viewport.size);
        let bounds = viewport.bounds().scale(self.ctx.options.ratio, None);
        let position = viewport.layer_pixel_from_map(&bounds.top_left());

        let mut env = self.ctx.env(viewport);
        self.grid.place(
            0,
            0,
            bounds,
            position,
            size,
            true,
            self.prototype.as_ref(),
            &mut env,
        );
        self.grid.remove_excess(1, 1, &mut env);

        self.stats.single_tile_draws += 1;
        log::debug!("{} single tile at {} ({}x{})", self.properties.id, bounds, size.w, size.h);
    }

    fn init_gridded_tiles(&mut self, viewport: &Viewport) {
        let tile_size = self.ctx.options.tile_size;
        let plan = plan_grid(
            &viewport.bounds(),
            &self.ctx.options.max_extent,
            viewport.resolution,
            tile_size,
            self.ctx.options.buffer,
            viewport.size,
            viewport.surface_offset(),
        );

        {
            let mut env = self.ctx.env(viewport);
            for (row, col, cell) in plan.cells() {
                self.grid.place(
                    row,
                    col,
                    cell.bounds,
                    cell.position,
                    tile_size,
                    false,
                    self.prototype.as_ref(),
                    &mut env,
                );
            }
            let removed = self.grid.remove_excess(plan.rows, plan.cols, &mut env);
            if removed > 0 {
                log::trace!("{} dropped {} excess tiles", self.properties.id, removed);
            }
        }

        self.stats.relayouts += 1;
        log::debug!(
            "{} relayout to {}x{} at resolution {}",
            self.properties.id,
            plan.rows,
            plan.cols,
            viewport.resolution
        );

        self.spiral_tile_load(viewport);
    }

    /// Requests every tile, center-most first
    fn spiral_tile_load(&mut self, viewport: &Viewport) {
        let (rows, cols) = self.grid.dims();
        let grid = &mut self.grid;
        let queue = spiral_walk(rows, cols, |row, col| grid.claim(row, col));

        let mut env = self.ctx.env(viewport);
        for id in queue {
            if let Some(tile) = self.grid.get_mut(id) {
                tile.draw(&mut env);
                tile.set_queued(false);
            }
        }
    }

    fn move_gridded_tiles(&mut self, viewport: &Viewport) {
        let buffer = self.ctx.options.buffer as f64;
        let tile_size = self.ctx.options.tile_size;
        let (w, h) = (tile_size.w as f64, tile_size.h as f64);

        loop {
            let Some(first) = self.grid.tile_at(0, 0) else {
                break;
            };
            let offset = viewport.viewport_point_from_layer(&first.position().to_point());

            let mut env = self.ctx.env(viewport);
            if offset.x > -w * buffer {
                self.grid.shift_column(true, viewport.resolution, tile_size, &mut env);
                self.stats.column_shifts += 1;
            } else if offset.x < -w * (buffer + 1.0) {
                self.grid.shift_column(false, viewport.resolution, tile_size, &mut env);
                self.stats.column_shifts += 1;
            } else if offset.y > -h * buffer {
                self.grid.shift_row(true, viewport.resolution, tile_size, &mut env);
                self.stats.row_shifts += 1;
            } else if offset.y < -h * (buffer + 1.0) {
                self.grid.shift_row(false, viewport.resolution, tile_size, &mut env);
                self.stats.row_shifts += 1;
            } else {
                break;
            }
        }
    }

    /// Applies every fetch that finished since the last call. Completions
    /// for tiles that were moved, unloaded or destroyed in the meantime are
    /// dropped. Returns how many were applied.
    pub fn process_completions(&mut self) -> Result<usize> {
        let results = self.ctx.loader.try_recv_results();
        if results.is_empty() {
            return Ok(0);
        }

        let viewport = self.viewport.clone().unwrap_or_default();
        let mut applied = 0;

        for result in results {
            let before = self.accounting.loading();
            let id = result.ticket.tile;

            let accepted = {
                let mut env = self.ctx.env(&viewport);
                match self.grid.get_mut(id) {
                    Some(tile) => tile.finish(result.ticket, result.data, &mut env),
                    None => false,
                }
            };

            if !accepted {
                self.stats.stale_completions += 1;
                log::debug!("{} dropped stale completion for {}", self.properties.id, id);
                continue;
            }

            applied += 1;
            self.flush(before, Some(id));
        }

        Ok(applied)
    }

    /// Moves pending tile events into the layer's notifications, updating
    /// the load counter, and publishes any zero crossing of the counter.
    fn flush(&mut self, before: usize, completed: Option<TileId>) {
        let mut published = Vec::with_capacity(self.ctx.events.len());
        for (tile, event) in self.ctx.events.drain(..) {
            self.accounting.apply(event);
            published.push(GridEvent::Tile { tile, event });
        }

        let after = self.accounting.loading();
        if let Some(tile) = completed.and_then(|id| self.grid.get_mut(id)) {
            tile.reset_back_buffer(after == 0, &self.ctx.options);
        }

        match load_edge(before, after) {
            Some(GridEvent::LoadStart) => {
                log::info!("{} started loading", self.properties.id);
                self.events.push(GridEvent::LoadStart);
                self.events.extend(published);
            }
            Some(GridEvent::AllLoaded) => {
                log::info!("{} finished loading", self.properties.id);
                for tile in self.grid.iter_mut() {
                    tile.reset_back_buffer(true, &self.ctx.options);
                }
                self.events.extend(published);
                self.events.push(GridEvent::AllLoaded);
            }
            _ => self.events.extend(published),
        }
    }

    /// Destroys every tile; the next move rebuilds the grid
    pub fn clear_grid(&mut self) {
        let before = self.accounting.loading();
        let viewport = self.viewport.clone().unwrap_or_default();
        {
            let mut env = self.ctx.env(&viewport);
            self.grid.clear(&mut env);
        }
        self.flush(before, None);
    }

    /// Rebuilds the grid at the last viewport. Returns `false` when the
    /// layer was never moved.
    pub fn redraw(&mut self) -> Result<bool> {
        let Some(viewport) = self.viewport.clone() else {
            return Ok(false);
        };
        self.clear_grid();
        self.move_to(&viewport, true, false)?;
        Ok(true)
    }

    /// Cancels everything outstanding and releases all tiles
    pub fn destroy(&mut self) {
        self.clear_grid();
        self.viewport = None;
    }

    pub fn on_map_resize(&mut self) {
        if self.ctx.options.single_tile {
            self.clear_grid();
        }
    }

    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    /// Back-buffers first, then tiles, in viewport pixels
    pub fn draw_list(&self, viewport: &Viewport) -> Vec<DrawItem> {
        let opacity = self.properties.opacity;
        let (shadows, tiles): (Vec<DrawItem>, Vec<DrawItem>) = self
            .grid
            .iter()
            .flat_map(|tile| tile.draw_items(viewport, opacity))
            .partition(|item| item.back_buffer);

        shadows.into_iter().chain(tiles).collect()
    }
}

fn layer_type_for(options: &GridOptions) -> LayerType {
    if options.single_tile {
        LayerType::SingleTile
    } else {
        LayerType::Grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::{Pixel, Size};
    use crate::layers::grid::test_support::EchoFetcher;
    use crate::runtime::ManualSpawner;
    use crate::tiles::{source::TemplateSource, types::LoadState};

    fn layer(options: GridOptions) -> (GridLayer, ManualSpawner) {
        let spawner = ManualSpawner::new();
        let layer = GridLayer::new(
            "grid",
            "Grid",
            Arc::new(TemplateSource::new("{bbox}")),
            Arc::new(EchoFetcher),
            Arc::new(spawner.clone()),
            options,
        )
        .unwrap();
        (layer, spawner)
    }

    fn unbuffered() -> GridOptions {
        GridOptions {
            buffer: 0,
            max_extent: Bounds::new(-65536.0, -65536.0, 65536.0, 65536.0),
            ..Default::default()
        }
    }

    fn aligned_viewport() -> Viewport {
        // Top-left corner at (0, 512): the first column and row align
        Viewport::new(Point::new(256.0, 256.0), 1.0, Size::square(512))
    }

    #[test]
    fn test_first_move_builds_grid_and_loads_center_first() {
        let (mut layer, _spawner) = layer(unbuffered());
        layer.move_to(&aligned_viewport(), false, false).unwrap();

        assert_eq!(layer.grid().dims(), (3, 3));
        assert_eq!(layer.stats().relayouts, 1);
        assert_eq!(layer.loading_count(), 9);

        let events = layer.drain_events();
        assert_eq!(events[0], GridEvent::LoadStart);
        let center = layer.grid().at(1, 1).unwrap();
        assert_eq!(
            events[1],
            GridEvent::Tile {
                tile: center,
                event: TileEvent::LoadStart
            }
        );
        assert_eq!(events.len(), 10);
    }

    #[test]
    fn test_small_pan_keeps_grid() {
        let (mut layer, _spawner) = layer(unbuffered());
        let mut viewport = aligned_viewport();
        layer.move_to(&viewport, false, false).unwrap();
        let ids = layer.grid().ids();

        viewport.pan(Point::new(10.0, 0.0));
        layer.move_to(&viewport, false, true).unwrap();

        assert_eq!(layer.grid().ids(), ids);
        assert_eq!(layer.stats().column_shifts, 0);
        assert_eq!(layer.stats().relayouts, 1);
    }

    #[test]
    fn test_pan_past_a_tile_shifts_one_column() {
        let (mut layer, _spawner) = layer(unbuffered());
        let mut viewport = aligned_viewport();
        layer.move_to(&viewport, false, false).unwrap();
        let ids = layer.grid().ids();

        viewport.pan(Point::new(300.0, 0.0));
        layer.move_to(&viewport, false, true).unwrap();

        let stats = layer.stats();
        assert_eq!((stats.column_shifts, stats.row_shifts, stats.relayouts), (1, 0, 1));

        let shifted = layer.grid().ids();
        for row in 0..3 {
            assert_eq!(shifted[row][2], ids[row][0]);
            assert_eq!(shifted[row][0], ids[row][1]);
        }
        let first = layer.grid().tile_at(0, 0).unwrap();
        let offset = viewport.viewport_point_from_layer(&first.position().to_point());
        assert_eq!(offset.x, -44.0);
        assert!(layer
            .tiles_bounds()
            .unwrap()
            .contains_bounds(&viewport.bounds(), false, true));
    }

    #[test]
    fn test_stale_completion_is_dropped() {
        let (mut layer, spawner) = layer(unbuffered());
        let mut viewport = aligned_viewport();
        layer.move_to(&viewport, false, false).unwrap();

        // Eight fetches finish, but the view jumps before they are applied
        spawner.run_until_stalled();
        viewport.set_center(Point::new(30_000.0, 30_000.0));
        layer.move_to(&viewport, false, false).unwrap();
        assert_eq!(layer.stats().relayouts, 2);
        layer.drain_events();

        assert_eq!(layer.process_completions().unwrap(), 0);
        assert_eq!(layer.stats().stale_completions, 8);
        assert_eq!(layer.loading_count(), 9);

        let mut applied = 0;
        for _ in 0..3 {
            spawner.run_until_stalled();
            applied += layer.process_completions().unwrap();
        }
        assert_eq!(applied, 9);
        assert_eq!(layer.loading_count(), 0);
        assert_eq!(layer.drain_events().last(), Some(&GridEvent::AllLoaded));

        for tile in layer.grid().iter() {
            assert_eq!(tile.state(), LoadState::Loaded);
            assert!(tile.bounds().left >= 29_000.0);
        }
    }

    #[test]
    fn test_tile_bounds_at_pixel() {
        let (mut layer, _spawner) = layer(unbuffered());
        assert!(layer.tile_bounds_at(Point::new(0.0, 0.0)).is_none());

        layer.move_to(&aligned_viewport(), false, false).unwrap();
        let bounds = layer.tile_bounds_at(Point::new(300.0, 10.0)).unwrap();
        assert_eq!(bounds.left, 256.0);
        assert_eq!(bounds.top, 512.0);
    }

    #[test]
    fn test_clear_grid_cancels_loads() {
        let (mut layer, spawner) = layer(unbuffered());
        layer.move_to(&aligned_viewport(), false, false).unwrap();
        layer.drain_events();

        layer.clear_grid();
        assert!(layer.grid().is_empty());
        assert_eq!(layer.loading_count(), 0);
        assert_eq!(layer.drain_events().last(), Some(&GridEvent::AllLoaded));

        spawner.run_until_stalled();
        assert_eq!(layer.process_completions().unwrap(), 0);
    }

    #[test]
    fn test_single_tile_position() {
        let (mut layer, _spawner) = layer(GridOptions {
            single_tile: true,
            ratio: 1.5,
            ..Default::default()
        });
        let viewport = Viewport::new(Point::new(0.0, 0.0), 1.0, Size::new(400, 200));
        layer.move_to(&viewport, false, false).unwrap();

        let tile = layer.grid().tile_at(0, 0).unwrap();
        assert_eq!(layer.grid().dims(), (1, 1));
        assert_eq!(tile.size(), Size::new(600, 300));
        assert_eq!(tile.bounds(), Bounds::new(-300.0, -150.0, 300.0, 150.0));
        assert_eq!(tile.position(), Pixel::new(-100, -50));
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let (mut layer, _spawner) = layer(unbuffered());
        let mut viewport = aligned_viewport();
        viewport.resolution = 0.0;
        assert!(layer.move_to(&viewport, true, false).is_err());
        assert!(layer.grid().is_empty());
    }
}
