#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mapgrid::prelude::*;

/// Answers each locator with its own bytes. Locators containing one of the
/// configured fragments fail instead. Every fetch that actually starts is
/// recorded.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    failing: Arc<Mutex<Vec<String>>>,
    started: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, fragment: &str) -> Self {
        self.failing.lock().unwrap().push(fragment.to_string());
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl TileFetcher for ScriptedFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        self.started.lock().unwrap().push(locator.to_string());
        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| locator.contains(fragment.as_str()));
        if fails {
            return Err(GridError::Fetch(format!("HTTP 500 for {}", locator)).into());
        }
        Ok(locator.as_bytes().to_vec())
    }
}

/// 256 x 256 lattice anchored so that multiples of 256 fall on tile edges
pub fn aligned_extent() -> Bounds {
    Bounds::new(-65536.0, -65536.0, 65536.0, 65536.0)
}

pub fn options(buffer: u32) -> GridOptions {
    GridOptions {
        buffer,
        max_extent: aligned_extent(),
        ..Default::default()
    }
}

/// 512 x 512 view whose top-left corner sits on a tile corner
pub fn aligned_viewport(resolution: f64) -> Viewport {
    Viewport::new(
        Point::new(256.0 * resolution, 256.0 * resolution),
        resolution,
        Size::square(512),
    )
}

pub fn grid_layer(
    options: GridOptions,
    fetcher: &ScriptedFetcher,
    spawner: &ManualSpawner,
) -> GridLayer {
    GridLayer::new(
        "grid",
        "Grid",
        Arc::new(TemplateSource::new("tile/{left}/{top}/{width}")),
        Arc::new(fetcher.clone()),
        Arc::new(spawner.clone()),
        options,
    )
    .unwrap()
}

/// Runs fetches and applies completions until the layer is idle
pub fn settle(layer: &mut GridLayer, spawner: &ManualSpawner) -> usize {
    let mut applied = 0;
    for _ in 0..64 {
        spawner.run_until_stalled();
        applied += layer.process_completions().unwrap();
        if layer.loading_count() == 0 {
            break;
        }
    }
    applied
}

/// The load counter matches the tiles, and is zero exactly when every tile
/// is in a terminal state
pub fn assert_counter_consistent(layer: &GridLayer) {
    assert_eq!(layer.loading_count(), layer.grid().loading_count());
    let all_terminal = layer.grid().iter().all(|tile| tile.state().is_terminal());
    assert_eq!(layer.loading_count() == 0, all_terminal);
}

pub fn sorted_ids(layer: &GridLayer) -> Vec<TileId> {
    let mut ids: Vec<TileId> = layer.grid().ids().into_iter().flatten().collect();
    ids.sort();
    ids
}

/// Position of `id` in the matrix
pub fn cell_of(layer: &GridLayer, id: TileId) -> Option<(usize, usize)> {
    layer
        .grid()
        .ids()
        .iter()
        .enumerate()
        .find_map(|(r, row)| row.iter().position(|t| *t == id).map(|c| (r, c)))
}
