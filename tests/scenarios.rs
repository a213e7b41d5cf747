mod common;

use common::*;
use mapgrid::prelude::*;

fn leftmost_column_left(layer: &GridLayer) -> f64 {
    let ids = layer.grid().ids();
    layer.tile(ids[0][0]).unwrap().bounds().left
}

#[test]
fn short_pan_keeps_grid_and_long_pan_shifts_one_column() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(options(0), &fetcher, &spawner);

    let mut viewport = aligned_viewport(1.0);
    layer.move_to(&viewport, false, false).unwrap();
    assert_eq!(leftmost_column_left(&layer), 0.0);
    let bounds = layer.tiles_bounds();

    viewport.pan(Point::new(10.0, 0.0));
    layer.move_to(&viewport, false, true).unwrap();
    assert_eq!(layer.stats().column_shifts, 0);
    assert_eq!(layer.stats().relayouts, 1);
    assert_eq!(layer.tiles_bounds(), bounds);
    assert_eq!(leftmost_column_left(&layer), 0.0);

    viewport.pan(Point::new(290.0, 0.0));
    layer.move_to(&viewport, false, true).unwrap();
    assert_eq!(layer.stats().column_shifts, 1);
    assert_eq!(layer.stats().row_shifts, 0);
    assert_eq!(leftmost_column_left(&layer), 256.0);
    assert_eq!(layer.grid().dims(), (3, 3));
}

#[test]
fn zoom_relayouts_with_the_same_tiles() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(options(0), &fetcher, &spawner);

    let mut viewport = aligned_viewport(2.0);
    layer.move_to(&viewport, false, false).unwrap();
    settle(&mut layer, &spawner);
    let ids = sorted_ids(&layer);

    viewport.set_resolution(1.0);
    layer.move_to(&viewport, true, false).unwrap();

    assert_eq!(layer.stats().relayouts, 2);
    assert_eq!(sorted_ids(&layer), ids);
    for tile in layer.grid().iter() {
        assert!(tile.is_loading());
        assert_eq!(tile.resolution(), Some(1.0));
        assert_eq!(tile.bounds().width(), 256.0);
    }
    assert_counter_consistent(&layer);
}

fn grid_of(map: &Map) -> &GridLayer {
    map.layers()
        .get_layer("grid")
        .unwrap()
        .as_any()
        .downcast_ref::<GridLayer>()
        .unwrap()
}

#[test]
fn shrinking_the_map_destroys_excess_tiles() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let layer = grid_layer(options(1), &fetcher, &spawner);

    let mut map = MapBuilder::new()
        .with_viewport(Viewport::new(
            Point::new(600.0, 450.0),
            1.0,
            Size::new(1200, 900),
        ))
        .with_layer(Box::new(layer))
        .build()
        .unwrap();
    let (rows, cols) = grid_of(&map).grid().dims();
    let before = sorted_ids(grid_of(&map));
    assert!(map.is_loading());

    // Nothing has been fetched yet
    map.resize(Size::new(300, 200)).unwrap();

    let grid = grid_of(&map);
    let (new_rows, new_cols) = grid.grid().dims();
    assert!(new_rows < rows && new_cols < cols);
    assert_eq!(grid.grid().len(), new_rows * new_cols);
    assert_eq!(grid.stats().relayouts, 2);

    let after = sorted_ids(grid);
    let removed: Vec<TileId> = before
        .iter()
        .filter(|id| !after.contains(id))
        .copied()
        .collect();
    assert_eq!(removed.len(), rows * cols - new_rows * new_cols);
    assert!(removed.iter().all(|id| grid.tile(*id).is_none()));
    assert!(after.iter().all(|id| before.contains(id)));

    let loading = grid.grid().iter().filter(|tile| tile.is_loading()).count();
    assert_eq!(grid.loading_count(), loading);
    assert_counter_consistent(grid);

    for _ in 0..16 {
        spawner.run_until_stalled();
        map.update().unwrap();
    }
    let grid = grid_of(&map);
    assert_eq!(grid.loading_count(), 0);
    // Fetches of the destroyed tiles were cancelled, not left to land
    assert_eq!(grid.stats().stale_completions, 0);
    assert!(grid
        .grid()
        .iter()
        .all(|tile| tile.state() == LoadState::Loaded));
}

#[test]
fn jump_without_overlap_relayouts() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(options(1), &fetcher, &spawner);

    let mut viewport = aligned_viewport(1.0);
    layer.move_to(&viewport, false, false).unwrap();
    viewport.set_center(Point::new(20000.0, 20000.0));
    layer.move_to(&viewport, false, false).unwrap();

    let stats = layer.stats();
    assert_eq!(stats.relayouts, 2);
    assert_eq!((stats.row_shifts, stats.column_shifts), (0, 0));
    assert!(layer
        .tiles_bounds()
        .unwrap()
        .contains_bounds(&viewport.bounds(), false, true));
}

#[test]
fn completions_for_moved_tiles_are_dropped() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(
        GridOptions {
            loading: LoadingConfig {
                max_concurrent: 16,
                cache_size: 64,
            },
            ..options(0)
        },
        &fetcher,
        &spawner,
    );

    let mut viewport = aligned_viewport(1.0);
    layer.move_to(&viewport, false, false).unwrap();
    // Every fetch finishes before the layer hears about it
    assert_eq!(spawner.run_until_stalled(), 9);

    viewport.pan(Point::new(300.0, 0.0));
    layer.move_to(&viewport, false, true).unwrap();
    let reloads = layer
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, GridEvent::Tile { event: TileEvent::Reload, .. }))
        .count();
    assert_eq!(reloads, 3);

    assert_eq!(layer.process_completions().unwrap(), 6);
    assert_eq!(layer.stats().stale_completions, 3);
    assert_eq!(layer.loading_count(), 3);

    assert_eq!(settle(&mut layer, &spawner), 3);
    assert_eq!(layer.loading_count(), 0);
    for tile in layer.grid().iter() {
        assert!(tile.bounds().left >= 256.0);
        assert_eq!(tile.state(), LoadState::Loaded);
    }
}

#[test]
fn failed_fetch_marks_the_cell() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new().fail_on("tile/256/256/");
    let mut layer = grid_layer(options(0), &fetcher, &spawner);

    layer.move_to(&aligned_viewport(1.0), false, false).unwrap();
    let center = layer.grid().ids()[1][1];
    settle(&mut layer, &spawner);

    let tile = layer.tile(center).unwrap();
    assert!(tile.failed());
    assert_eq!(tile.state(), LoadState::Loaded);
    match tile.payload() {
        Some(TilePayload::Failed(marker)) => {
            assert_eq!(marker.class_name, "tile-load-error");
            assert!(marker.reason.contains("HTTP 500"));
        }
        other => panic!("expected a failure marker, got {:?}", other),
    }
    assert_eq!(layer.grid().iter().filter(|t| t.failed()).count(), 1);

    let events = layer.drain_events();
    assert!(events.contains(&GridEvent::Tile {
        tile: center,
        event: TileEvent::LoadEnd { failed: true },
    }));
    assert_eq!(events.last(), Some(&GridEvent::AllLoaded));
}

#[test]
fn resize_transition_shows_back_buffers_until_everything_loads() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(
        GridOptions {
            transition: TransitionEffect::Resize,
            ..options(0)
        },
        &fetcher,
        &spawner,
    );

    let mut viewport = aligned_viewport(2.0);
    layer.move_to(&viewport, false, false).unwrap();
    settle(&mut layer, &spawner);
    assert!(layer.draw_list(&viewport).iter().all(|item| !item.back_buffer));

    viewport.set_resolution(1.0);
    layer.move_to(&viewport, true, false).unwrap();

    let items = layer.draw_list(&viewport);
    assert_eq!(items.len(), 9);
    for item in &items {
        assert!(item.back_buffer);
        // Imagery taken at resolution 2 covers twice the pixels at 1
        assert_eq!(item.frame.width, 512.0);
        assert_eq!(item.frame.height, 512.0);
    }

    settle(&mut layer, &spawner);
    let items = layer.draw_list(&viewport);
    assert_eq!(items.iter().filter(|item| item.back_buffer).count(), 0);
    assert_eq!(items.len(), 9);
}

#[test]
fn single_tile_redraws_only_when_the_view_leaves_it() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(
        GridOptions {
            single_tile: true,
            ..options(0)
        },
        &fetcher,
        &spawner,
    );

    let mut viewport = Viewport::new(Point::new(0.0, 0.0), 1.0, Size::new(400, 200));
    layer.move_to(&viewport, false, false).unwrap();
    settle(&mut layer, &spawner);
    assert_eq!(layer.grid().dims(), (1, 1));
    assert_eq!(layer.stats().single_tile_draws, 1);

    // Still inside the oversized tile
    viewport.pan(Point::new(100.0, 0.0));
    layer.move_to(&viewport, false, false).unwrap();
    assert_eq!(layer.stats().single_tile_draws, 1);

    // Outside, but dragging defers the redraw
    viewport.pan(Point::new(100.0, 0.0));
    layer.move_to(&viewport, false, true).unwrap();
    assert_eq!(layer.stats().single_tile_draws, 1);

    layer.move_to(&viewport, false, false).unwrap();
    assert_eq!(layer.stats().single_tile_draws, 2);
    assert_eq!(
        layer.tiles_bounds(),
        Some(Bounds::new(-100.0, -150.0, 500.0, 150.0))
    );

    // The previous image stays up while the new one loads
    let items = layer.draw_list(&viewport);
    assert_eq!(items.len(), 1);
    assert!(items[0].back_buffer);

    settle(&mut layer, &spawner);
    let items = layer.draw_list(&viewport);
    assert_eq!(items.len(), 1);
    assert!(!items[0].back_buffer);
    assert_eq!(items[0].frame.width, 600.0);
}

#[test]
fn replacing_options_rebuilds_on_next_move() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let mut layer = grid_layer(options(1), &fetcher, &spawner);

    let viewport = aligned_viewport(1.0);
    layer.move_to(&viewport, false, false).unwrap();
    assert_eq!(layer.grid().dims(), (5, 5));
    layer.drain_events();

    layer
        .set_grid_options(GridOptions {
            single_tile: true,
            ..options(1)
        })
        .unwrap();
    assert!(layer.grid().is_empty());
    assert_eq!(layer.loading_count(), 0);
    assert_eq!(layer.drain_events().last(), Some(&GridEvent::AllLoaded));

    layer.move_to(&viewport, false, false).unwrap();
    assert_eq!(layer.grid().dims(), (1, 1));
    assert_eq!(layer.grid().iter().next().unwrap().size(), Size::square(768));
}

#[test]
fn map_drives_its_layers() {
    let spawner = ManualSpawner::new();
    let fetcher = ScriptedFetcher::new();
    let layer = grid_layer(options(1), &fetcher, &spawner);

    let mut map = MapBuilder::new()
        .with_viewport(aligned_viewport(1.0))
        .with_resolution_limits(Some(0.25), Some(4.0))
        .with_layer(Box::new(layer))
        .build()
        .unwrap();
    assert!(map.is_loading());

    for _ in 0..16 {
        spawner.run_until_stalled();
        map.update().unwrap();
    }
    assert!(!map.is_loading());

    let events = map.process_events();
    assert_eq!(events.first().map(|e| e.event), Some(GridEvent::LoadStart));
    assert_eq!(events.last().map(|e| e.event), Some(GridEvent::AllLoaded));
    assert!(events.iter().all(|e| e.layer_id == "grid"));

    map.pan_by(300.0, 0.0, true).unwrap();
    assert!(map.is_loading());

    assert!(map.zoom_to(0.5).unwrap());
    // Clamped to the finest allowed resolution
    assert!(map.zoom_to(0.1).unwrap());
    assert_eq!(map.viewport().resolution, 0.25);

    let grid = grid_of(&map);
    let stats = grid.stats();
    assert_eq!(stats.column_shifts, 1);
    assert_eq!(stats.relayouts, 3);
    assert!(grid
        .tiles_bounds()
        .unwrap()
        .contains_bounds(&map.viewport().bounds(), false, true));
}
