//! A single grid cell and its load lifecycle.
//!
//! ```text
//! Idle ──draw──▶ Loading ──finish──▶ Loaded ──clear──▶ Unloaded
//!                  │  ▲                                  │
//!                  │  └──────────────draw────────────────┘
//!                  └──unload──▶ Unloaded
//! any ──draw outside max extent──▶ NotDrawn
//! ```
//!
//! Tiles never reach back into the grid that owns them. Everything a
//! transition needs (the fetcher, the options, where to put events) is
//! passed in through a [`TileEnv`].

use crate::core::{
    bounds::Bounds,
    config::GridOptions,
    geo::{Frame, Pixel, Size},
    viewport::Viewport,
};
use crate::prelude::Arc;
use crate::tiles::{
    back_buffer::BackBuffer,
    content::TileContent,
    loader::TileLoader,
    source::TileSource,
    types::{DrawItem, FetchTicket, LoadState, TileEvent, TileId, TilePayload},
};
use crate::Result;

/// Borrowed collaborators for a tile transition
pub struct TileEnv<'a> {
    pub options: &'a GridOptions,
    pub source: &'a dyn TileSource,
    pub loader: &'a mut TileLoader,
    pub viewport: &'a Viewport,
    /// Last generation handed out; bumped for every issued fetch
    pub generation: &'a mut u64,
    pub events: &'a mut Vec<(TileId, TileEvent)>,
}

impl TileEnv<'_> {
    fn next_ticket(&mut self, tile: TileId) -> FetchTicket {
        *self.generation += 1;
        FetchTicket {
            tile,
            generation: *self.generation,
        }
    }

    fn emit(&mut self, tile: TileId, event: TileEvent) {
        log::trace!("{} {:?}", tile, event);
        self.events.push((tile, event));
    }
}

#[derive(Debug)]
pub struct Tile {
    id: TileId,
    bounds: Bounds,
    /// Upper-left corner in layer pixels
    position: Pixel,
    size: Size,
    state: LoadState,
    queued: bool,
    failed: bool,
    content: Box<dyn TileContent>,
    locator: Option<String>,
    request: Option<FetchTicket>,
    /// Resolution of the last issued fetch
    resolution: Option<f64>,
    back_buffer: Option<BackBuffer>,
    loaded_at: Option<instant::Instant>,
}

impl Tile {
    pub fn new(
        id: TileId,
        bounds: Bounds,
        position: Pixel,
        size: Size,
        content: Box<dyn TileContent>,
    ) -> Self {
        Self {
            id,
            bounds,
            position,
            size,
            state: LoadState::Idle,
            queued: false,
            failed: false,
            content,
            locator: None,
            request: None,
            resolution: None,
            back_buffer: None,
            loaded_at: None,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn position(&self) -> Pixel {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Whether the last completed fetch failed
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    pub(crate) fn set_queued(&mut self, queued: bool) {
        self.queued = queued;
    }

    /// Locator of the last issued fetch
    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    /// The outstanding fetch, if any
    pub fn request(&self) -> Option<FetchTicket> {
        self.request
    }

    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    pub fn payload(&self) -> Option<&TilePayload> {
        self.content.payload()
    }

    pub fn content(&self) -> &dyn TileContent {
        self.content.as_ref()
    }

    pub fn back_buffer(&self) -> Option<&BackBuffer> {
        self.back_buffer.as_ref()
    }

    pub fn loaded_at(&self) -> Option<instant::Instant> {
        self.loaded_at
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    fn within_max_extent(&self, options: &GridOptions) -> bool {
        options.max_extent.contains_bounds(&self.bounds, true, false)
    }

    /// Requests imagery for the tile's current cell.
    ///
    /// Returns `false` when the cell lies outside the layer's maximum extent
    /// and the layer does not display such cells; the tile then ends in
    /// [`LoadState::NotDrawn`] without fetching. Drawing a tile that is
    /// already loading cancels the old fetch and emits `Reload` instead of
    /// `LoadStart`.
    pub fn draw(&mut self, env: &mut TileEnv<'_>) -> bool {
        let should_draw = self.within_max_extent(env.options) || env.options.display_outside_max_extent;
        self.clear();

        if env.options.uses_back_buffer() && self.content.supports_back_buffer() {
            if should_draw {
                let shadow = self
                    .back_buffer
                    .get_or_insert_with(|| BackBuffer::new(self.bounds, self.position, self.size));
                shadow.start_transition(
                    env.viewport.resolution,
                    env.viewport,
                    env.options.single_tile,
                );
            } else if let Some(shadow) = self.back_buffer.as_mut() {
                shadow.clear();
            }
        }

        if !should_draw {
            self.unload(env);
            self.state = LoadState::NotDrawn;
            log::trace!("{} outside max extent at {}", self.id, self.bounds);
            return false;
        }

        if self.state == LoadState::Loading {
            if let Some(stale) = self.request.take() {
                env.loader.cancel(&stale);
            }
            self.content.unload();
            env.emit(self.id, TileEvent::Reload);
        } else {
            self.state = LoadState::Loading;
            env.emit(self.id, TileEvent::LoadStart);
        }

        self.render(env);
        true
    }

    fn render(&mut self, env: &mut TileEnv<'_>) {
        let locator = env.source.url(&self.bounds, self.size);
        let ticket = env.next_ticket(self.id);

        self.content.load(&locator);
        self.resolution = Some(env.viewport.resolution);
        self.request = Some(ticket);
        self.locator = Some(locator.clone());
        env.loader.request(ticket, locator);
    }

    /// Applies a completed fetch. Returns `false`, leaving the tile
    /// untouched, when `ticket` is not the tile's current request.
    pub fn finish(
        &mut self,
        ticket: FetchTicket,
        data: Result<Arc<Vec<u8>>>,
        env: &mut TileEnv<'_>,
    ) -> bool {
        if self.state != LoadState::Loading || self.request != Some(ticket) {
            log::trace!("{} dropping stale completion {:?}", self.id, ticket);
            return false;
        }

        self.request = None;
        let ok = self.content.finish(data, &env.options.failure_indicator);
        self.failed = !ok;
        self.state = LoadState::Loaded;
        self.loaded_at = Some(instant::Instant::now());
        env.emit(self.id, TileEvent::LoadEnd { failed: !ok });
        true
    }

    /// Hands freshly loaded imagery to the back-buffer, if it is due for it.
    /// `none_loading` tells whether the layer has no fetch in flight.
    pub fn reset_back_buffer(&mut self, none_loading: bool, options: &GridOptions) {
        if self.state != LoadState::Loaded {
            return;
        }
        let within = self.within_max_extent(options);
        let Some(resolution) = self.resolution else {
            return;
        };

        if let Some(shadow) = self.back_buffer.as_mut() {
            if shadow.wants_reset(self.failed, none_loading) {
                shadow.reset_from(
                    self.bounds,
                    self.position,
                    self.size,
                    resolution,
                    self.content.payload().cloned(),
                    within,
                );
            }
        }
    }

    /// Cancels the in-flight fetch. Only meaningful while loading.
    pub fn unload(&mut self, env: &mut TileEnv<'_>) -> bool {
        if self.state != LoadState::Loading {
            return false;
        }

        if let Some(ticket) = self.request.take() {
            env.loader.cancel(&ticket);
        }
        self.content.unload();
        self.state = LoadState::Unloaded;
        env.emit(self.id, TileEvent::Unload);
        true
    }

    /// Re-casts the tile to another cell. With `redraw` the new cell is
    /// requested right away (a fetch still in flight becomes a reload);
    /// without it any in-flight fetch is cancelled.
    pub fn move_to(
        &mut self,
        bounds: Bounds,
        position: Pixel,
        redraw: bool,
        env: &mut TileEnv<'_>,
    ) -> bool {
        if !redraw {
            self.unload(env);
        }

        self.bounds = bounds;
        self.position = position;

        if redraw {
            self.draw(env)
        } else {
            false
        }
    }

    /// Drops displayed content; a loaded tile becomes unloaded
    pub fn clear(&mut self) {
        self.content.clear();
        if self.state == LoadState::Loaded {
            self.state = LoadState::Unloaded;
        }
    }

    /// Cancels outstanding work and releases everything the tile holds
    pub fn destroy(&mut self, env: &mut TileEnv<'_>) {
        self.unload(env);
        self.clear();
        self.back_buffer = None;
    }

    /// Back-buffer (if shown) then the tile itself, in viewport pixels
    pub fn draw_items(&self, viewport: &Viewport, opacity: f32) -> Vec<DrawItem> {
        let mut items = Vec::with_capacity(2);

        if let Some(shadow) = self.back_buffer.as_ref().filter(|s| s.is_visible()) {
            if let Some(payload) = shadow.payload() {
                let frame = shadow.frame();
                items.push(DrawItem {
                    tile: self.id,
                    frame: Frame::new(
                        viewport.viewport_point_from_layer(&frame.origin),
                        frame.width,
                        frame.height,
                    ),
                    payload: payload.clone(),
                    back_buffer: true,
                    opacity,
                });
            }
        }

        if self.state == LoadState::Loaded {
            if let Some(payload) = self.content.payload() {
                let frame = Frame::from_pixel(self.position, self.size);
                items.push(DrawItem {
                    tile: self.id,
                    frame: Frame::new(
                        viewport.viewport_point_from_layer(&frame.origin),
                        frame.width,
                        frame.height,
                    ),
                    payload: payload.clone(),
                    back_buffer: false,
                    opacity,
                });
            }
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::runtime::ManualSpawner;
    use crate::tiles::{
        content::ImageContent,
        loader::{FetchResult, TileFetcher},
        source::TemplateSource,
    };
    use async_trait::async_trait;

    struct BytesFetcher;

    #[async_trait]
    impl TileFetcher for BytesFetcher {
        async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
            if locator.contains("-1") {
                return Err("HTTP 404".into());
            }
            Ok(locator.as_bytes().to_vec())
        }
    }

    struct Harness {
        options: GridOptions,
        source: TemplateSource,
        loader: TileLoader,
        viewport: Viewport,
        generation: u64,
        events: Vec<(TileId, TileEvent)>,
        spawner: ManualSpawner,
    }

    impl Harness {
        fn new(options: GridOptions) -> Self {
            let spawner = ManualSpawner::new();
            let loader = TileLoader::new(
                Arc::new(BytesFetcher),
                Arc::new(spawner.clone()),
                &options.loading,
            );
            Self {
                options,
                source: TemplateSource::new("{left},{top}"),
                loader,
                viewport: Viewport::new(Point::new(128.0, 128.0), 1.0, Size::square(256)),
                generation: 0,
                events: Vec::new(),
                spawner,
            }
        }

        fn env(&mut self) -> TileEnv<'_> {
            TileEnv {
                options: &self.options,
                source: &self.source,
                loader: &mut self.loader,
                viewport: &self.viewport,
                generation: &mut self.generation,
                events: &mut self.events,
            }
        }

        fn complete(&mut self) -> Vec<FetchResult> {
            self.spawner.run_until_stalled();
            self.loader.try_recv_results()
        }

        fn event_kinds(&mut self) -> Vec<TileEvent> {
            self.events.drain(..).map(|(_, e)| e).collect()
        }
    }

    fn tile_at(left: f64, top: f64) -> Tile {
        Tile::new(
            TileId(1),
            Bounds::new(left, top - 256.0, left + 256.0, top),
            Pixel::new(0, 0),
            Size::square(256),
            Box::new(ImageContent::new()),
        )
    }

    fn bounded_options() -> GridOptions {
        GridOptions {
            max_extent: Bounds::new(0.0, 0.0, 1024.0, 1024.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_draw_load_finish() {
        let mut harness = Harness::new(bounded_options());
        let mut tile = tile_at(0.0, 256.0);

        assert!(tile.draw(&mut harness.env()));
        assert_eq!(tile.state(), LoadState::Loading);
        assert_eq!(tile.locator(), Some("0,256"));
        assert_eq!(harness.event_kinds(), vec![TileEvent::LoadStart]);

        let results = harness.complete();
        assert_eq!(results.len(), 1);
        let result = results.into_iter().next().unwrap();
        assert!(tile.finish(result.ticket, result.data, &mut harness.env()));

        assert_eq!(tile.state(), LoadState::Loaded);
        assert!(!tile.failed());
        assert!(tile.loaded_at().is_some());
        assert_eq!(
            harness.event_kinds(),
            vec![TileEvent::LoadEnd { failed: false }]
        );
    }

    #[test]
    fn test_outside_extent_is_not_drawn() {
        let mut harness = Harness::new(bounded_options());
        let mut tile = tile_at(2048.0, 2048.0);

        assert!(!tile.draw(&mut harness.env()));
        assert_eq!(tile.state(), LoadState::NotDrawn);
        assert!(harness.event_kinds().is_empty());
        assert_eq!(harness.loader.pending_count(), 0);

        // Touching the extent edge does not count as inside
        let mut edge = tile_at(1024.0, 256.0);
        assert!(!edge.draw(&mut harness.env()));

        harness.options.display_outside_max_extent = true;
        assert!(tile.draw(&mut harness.env()));
        assert_eq!(tile.state(), LoadState::Loading);
    }

    #[test]
    fn test_redraw_while_loading_is_reload() {
        let mut harness = Harness::new(bounded_options());
        let mut tile = tile_at(0.0, 256.0);

        tile.draw(&mut harness.env());
        let first = tile.request().unwrap();

        tile.move_to(
            Bounds::new(256.0, 0.0, 512.0, 256.0),
            Pixel::new(256, 0),
            true,
            &mut harness.env(),
        );
        let second = tile.request().unwrap();

        assert_ne!(first, second);
        assert_eq!(
            harness.event_kinds(),
            vec![TileEvent::LoadStart, TileEvent::Reload]
        );

        // The first fetch was cancelled; its ticket would be stale anyway
        let results = harness.complete();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ticket, second);
        assert!(!tile.finish(first, Ok(Arc::new(vec![1])), &mut harness.env()));
        assert_eq!(tile.state(), LoadState::Loading);
    }

    #[test]
    fn test_move_without_redraw_unloads() {
        let mut harness = Harness::new(bounded_options());
        let mut tile = tile_at(0.0, 256.0);

        tile.draw(&mut harness.env());
        harness.event_kinds();

        assert!(!tile.move_to(
            Bounds::new(0.0, 256.0, 256.0, 512.0),
            Pixel::new(0, -256),
            false,
            &mut harness.env(),
        ));
        assert_eq!(tile.state(), LoadState::Unloaded);
        assert!(tile.request().is_none());
        assert_eq!(harness.event_kinds(), vec![TileEvent::Unload]);
        assert!(harness.complete().is_empty());

        // unload is a no-op unless loading
        assert!(!tile.unload(&mut harness.env()));
    }

    #[test]
    fn test_failed_fetch_still_terminates() {
        let mut harness = Harness::new(GridOptions {
            max_extent: Bounds::new(-1024.0, -1024.0, 1024.0, 1024.0),
            ..Default::default()
        });
        let mut tile = tile_at(-1.0, 256.0);

        tile.draw(&mut harness.env());
        let result = harness.complete().into_iter().next().unwrap();
        assert!(tile.finish(result.ticket, result.data, &mut harness.env()));

        assert_eq!(tile.state(), LoadState::Loaded);
        assert!(tile.failed());
        assert!(tile.payload().unwrap().is_failure());
        assert_eq!(
            harness.event_kinds(),
            vec![TileEvent::LoadStart, TileEvent::LoadEnd { failed: true }]
        );
    }

    #[test]
    fn test_clear_and_destroy() {
        let mut harness = Harness::new(bounded_options());
        let mut tile = tile_at(0.0, 256.0);

        tile.draw(&mut harness.env());
        let result = harness.complete().into_iter().next().unwrap();
        tile.finish(result.ticket, result.data, &mut harness.env());
        assert_eq!(tile.draw_items(&harness.viewport, 1.0).len(), 1);

        tile.clear();
        assert_eq!(tile.state(), LoadState::Unloaded);
        assert!(tile.payload().is_none());
        assert!(tile.draw_items(&harness.viewport, 1.0).is_empty());

        // Served from the cache, so the completion is already queued
        tile.draw(&mut harness.env());
        tile.destroy(&mut harness.env());
        assert_eq!(tile.state(), LoadState::Unloaded);
        for result in harness.complete() {
            assert!(!tile.finish(result.ticket, result.data, &mut harness.env()));
        }
        assert_eq!(tile.state(), LoadState::Unloaded);
    }
}
