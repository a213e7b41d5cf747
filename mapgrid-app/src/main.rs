use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use mapgrid::{
    prelude::{GridEvent, LayerEvent, TileEvent, TokioSpawner, XyzSource},
    Bounds, GridLayer, GridOptions, LoadingProfile, Map, MapBuilder, Point, Size, TemplateSource,
    TileFetcher, TransitionEffect, Viewport,
};

const HALF_WORLD: f64 = 20_037_508.342_789_244;

/// Answers every locator after a short delay; roughly one in `fail_every`
/// locators fails, so failure markers show up in the log.
struct SyntheticFetcher {
    latency: Duration,
    fail_every: u64,
}

#[async_trait]
impl TileFetcher for SyntheticFetcher {
    async fn fetch(&self, locator: &str) -> mapgrid::Result<Vec<u8>> {
        tokio::time::sleep(self.latency).await;
        if fxhash::hash64(locator) % self.fail_every == 0 {
            return Err(mapgrid::GridError::Fetch(format!("HTTP 503 for {}", locator)).into());
        }
        Ok(locator.as_bytes().to_vec())
    }
}

enum Step {
    Pan(f64, f64),
    Drag(f64, f64),
    Zoom(f64),
    Resize(u32, u32),
}

fn build_map() -> mapgrid::Result<Map> {
    let world = Bounds::new(-HALF_WORLD, -HALF_WORLD, HALF_WORLD, HALF_WORLD);
    let fetcher = Arc::new(SyntheticFetcher {
        latency: Duration::from_millis(15),
        fail_every: 23,
    });

    let base = GridLayer::new(
        "osm",
        "Base tiles",
        Arc::new(XyzSource::mercator("https://{s}.tile.example/{z}/{x}/{y}.png", world, 20)?
            .with_subdomains(&["a", "b", "c"])),
        fetcher.clone(),
        Arc::new(TokioSpawner),
        GridOptions {
            transition: TransitionEffect::Resize,
            ..GridOptions::default().with_profile(LoadingProfile::Balanced)
        },
    )?;

    let overlay = GridLayer::new(
        "wms",
        "Overlay",
        Arc::new(TemplateSource::new(
            "https://wms.example/?BBOX={bbox}&WIDTH={width}&HEIGHT={height}",
        )),
        fetcher,
        Arc::new(TokioSpawner),
        GridOptions {
            single_tile: true,
            ..GridOptions::default().with_profile(LoadingProfile::LowResource)
        },
    )?;

    // San Francisco, roughly zoom 12
    let viewport = Viewport::try_new(
        Point::new(-13_627_361.0, 4_547_675.0),
        2.0 * HALF_WORLD / 256.0 / 4096.0,
        Size::new(1200, 800),
    )?;

    MapBuilder::new()
        .with_viewport(viewport)
        .with_resolution_limits(Some(0.3), Some(2.0 * HALF_WORLD / 256.0))
        .with_layer(Box::new(base))
        .with_layer(Box::new(overlay))
        .build()
}

fn log_events(events: &[LayerEvent]) {
    for LayerEvent { layer_id, event } in events {
        match event {
            GridEvent::LoadStart => log::info!("[{}] loading", layer_id),
            GridEvent::AllLoaded => log::info!("[{}] all tiles loaded", layer_id),
            GridEvent::Tile {
                tile,
                event: TileEvent::LoadEnd { failed: true },
            } => log::warn!("[{}] {} failed", layer_id, tile),
            GridEvent::Tile { tile, event } => log::trace!("[{}] {} {:?}", layer_id, tile, event),
        }
    }
}

/// Applies completions until every layer is idle or `deadline` passes
async fn settle(map: &mut Map, deadline: Duration) -> mapgrid::Result<usize> {
    let started = tokio::time::Instant::now();
    let mut applied = 0;
    while map.is_loading() && started.elapsed() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
        applied += map.update()?;
        log_events(&map.process_events());
    }
    Ok(applied)
}

fn report(map: &Map) {
    for (layer_id, items) in map.render() {
        let shadows = items.iter().filter(|item| item.back_buffer).count();
        log::info!(
            "[{}] {} draw items ({} back-buffers)",
            layer_id,
            items.len(),
            shadows
        );
    }
    for layer in map.layers().layers() {
        if let Some(grid) = layer.as_any().downcast_ref::<GridLayer>() {
            log::info!("[{}] {:?}", layer.id(), grid.stats());
        }
    }
}

async fn run(map: &mut Map, steps: &[Step]) -> mapgrid::Result<()> {
    let deadline = Duration::from_secs(5);
    let applied = settle(map, deadline).await?;
    log::info!("initial view: {} tiles applied", applied);

    for step in steps {
        match *step {
            Step::Pan(dx, dy) => map.pan_by(dx, dy, false)?,
            Step::Drag(dx, dy) => {
                // A drag is a burst of small moves without waiting for tiles
                for _ in 0..10 {
                    map.pan_by(dx / 10.0, dy / 10.0, true)?;
                    map.update()?;
                }
                map.pan_by(0.0, 0.0, false)?;
            }
            Step::Zoom(factor) => {
                let target = map.viewport().resolution / factor;
                if !map.zoom_to(target)? {
                    log::info!("zoom to {} clamped away", target);
                }
            }
            Step::Resize(w, h) => map.resize(Size::new(w, h))?,
        }
        log_events(&map.process_events());

        let applied = settle(map, deadline).await?;
        log::info!(
            "view ({:.0}, {:.0}) at {:.2} m/px: {} tiles applied",
            map.viewport().center.x,
            map.viewport().center.y,
            map.viewport().resolution,
            applied
        );
    }

    report(map);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut map = build_map().map_err(|e| anyhow!(e))?;
    let steps = [
        Step::Pan(300.0, 0.0),
        Step::Drag(-900.0, 450.0),
        Step::Zoom(2.0),
        Step::Pan(0.0, -640.0),
        Step::Zoom(0.5),
        Step::Resize(1600, 900),
        Step::Pan(5000.0, 5000.0),
    ];

    tokio::select! {
        result = run(&mut map, &steps) => result.map_err(|e| anyhow!(e))?,
        _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
    }

    Ok(())
}
