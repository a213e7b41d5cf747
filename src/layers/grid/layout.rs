//! Grid layout calculation
//!
//! Pure functions mapping a viewport onto the tile lattice anchored at the
//! layer's maximum extent. Columns count from `extent.left`, rows from
//! `extent.bottom`; row 0 of a plan is the topmost.

use crate::core::{
    bounds::Bounds,
    geo::{Pixel, Point, Size},
};

/// Where the first (top-left) cell of a grid sits and how far apart cells are
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Width of one tile in map units
    pub tilelon: f64,
    /// Height of one tile in map units
    pub tilelat: f64,
    /// Left edge of the first column
    pub tileoffsetlon: f64,
    /// Bottom edge of the first row
    pub tileoffsetlat: f64,
    /// Viewport pixel of the first cell's upper-left corner (fractional)
    pub tileoffsetx: f64,
    pub tileoffsety: f64,
    /// Lattice column of the first column
    pub start_col: i64,
    /// Lattice row (counted upwards from `extent.bottom`) of the first row
    pub start_row: i64,
}

/// Aligns the top-left corner of `bounds`, minus `buffer` cells, to the
/// lattice defined by `extent`, `resolution` and `tile_size`.
pub fn calculate_grid_layout(
    bounds: &Bounds,
    extent: &Bounds,
    resolution: f64,
    tile_size: Size,
    buffer: u32,
) -> GridLayout {
    let buffer = buffer as f64;
    let tilelon = resolution * tile_size.w as f64;
    let tilelat = resolution * tile_size.h as f64;

    let offsetlon = bounds.left - extent.left;
    let tilecol = (offsetlon / tilelon).floor() - buffer;
    let tilecolremain = offsetlon / tilelon - tilecol;
    let tileoffsetx = -tilecolremain * tile_size.w as f64;
    let tileoffsetlon = extent.left + tilecol * tilelon;

    let offsetlat = bounds.top - (extent.bottom + tilelat);
    let tilerow = (offsetlat / tilelat).ceil() + buffer;
    let tilerowremain = tilerow - offsetlat / tilelat;
    let tileoffsety = -tilerowremain * tile_size.h as f64;
    let tileoffsetlat = extent.bottom + tilerow * tilelat;

    GridLayout {
        tilelon,
        tilelat,
        tileoffsetlon,
        tileoffsetlat,
        tileoffsetx,
        tileoffsety,
        start_col: tilecol as i64,
        start_row: tilerow as i64,
    }
}

/// Lower bound on rows and columns for a viewport, whatever its alignment
pub fn min_grid_size(viewport_size: Size, tile_size: Size, buffer: u32) -> (usize, usize) {
    let extra = (2 * buffer).max(1) as usize;
    let rows = (viewport_size.h as f64 / tile_size.h as f64).ceil() as usize + extra;
    let cols = (viewport_size.w as f64 / tile_size.w as f64).ceil() as usize + extra;
    (rows, cols)
}

/// Target bounds and layer-pixel position of one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPlan {
    pub bounds: Bounds,
    pub position: Pixel,
}

/// A full grid layout, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub rows: usize,
    pub cols: usize,
    pub layout: GridLayout,
    cells: Vec<CellPlan>,
}

impl LayoutPlan {
    pub fn cell(&self, row: usize, col: usize) -> &CellPlan {
        &self.cells[row * self.cols + col]
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &CellPlan)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i / cols, i % cols, cell))
    }

    /// Union of every planned cell
    pub fn bounds(&self) -> Bounds {
        let first = self.cell(0, 0).bounds;
        let last = self.cell(self.rows - 1, self.cols - 1).bounds;
        Bounds::new(first.left, last.bottom, last.right, first.top)
    }
}

/// Plans the matrix covering `bounds` plus `buffer` cells on every edge.
///
/// The first cell's pixel offset is rounded once; every further cell sits
/// exactly one tile size away, so neighbours never gap or overlap.
/// `surface_offset` is the viewport pixel of layer pixel (0, 0).
pub fn plan_grid(
    bounds: &Bounds,
    extent: &Bounds,
    resolution: f64,
    tile_size: Size,
    buffer: u32,
    viewport_size: Size,
    surface_offset: Point,
) -> LayoutPlan {
    let layout = calculate_grid_layout(bounds, extent, resolution, tile_size, buffer);
    let (min_rows, min_cols) = min_grid_size(viewport_size, tile_size, buffer);
    let reach_lon = layout.tilelon * buffer as f64;
    let reach_lat = layout.tilelat * buffer as f64;

    let start = Point::new(
        layout.tileoffsetx - surface_offset.x,
        layout.tileoffsety - surface_offset.y,
    )
    .round();

    let mut cols = 0;
    loop {
        cols += 1;
        let right = layout.tileoffsetlon + cols as f64 * layout.tilelon;
        if right > bounds.right + reach_lon && cols >= min_cols {
            break;
        }
    }

    let mut rows = 0;
    loop {
        rows += 1;
        let bottom = layout.tileoffsetlat - (rows - 1) as f64 * layout.tilelat;
        if bottom < bounds.bottom - reach_lat && rows >= min_rows {
            break;
        }
    }

    let mut cells = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let bottom = layout.tileoffsetlat - row as f64 * layout.tilelat;
        let y = start.y + (row as u32 * tile_size.h) as i32;
        for col in 0..cols {
            let left = layout.tileoffsetlon + col as f64 * layout.tilelon;
            let x = start.x + (col as u32 * tile_size.w) as i32;
            cells.push(CellPlan {
                bounds: Bounds::new(left, bottom, left + layout.tilelon, bottom + layout.tilelat),
                position: Pixel::new(x, y),
            });
        }
    }

    log::debug!(
        "planned {}x{} grid from col {} row {} at ({}, {})",
        rows,
        cols,
        layout.start_col,
        layout.start_row,
        start.x,
        start.y
    );

    LayoutPlan {
        rows,
        cols,
        layout,
        cells,
    }
}

/// Bounds of the lattice cell containing `map_point`
pub fn tile_bounds_at(map_point: &Point, extent: &Bounds, resolution: f64, tile_size: Size) -> Bounds {
    let tilelon = resolution * tile_size.w as f64;
    let tilelat = resolution * tile_size.h as f64;
    let left = extent.left + tilelon * ((map_point.x - extent.left) / tilelon).floor();
    let bottom = extent.bottom + tilelat * ((map_point.y - extent.bottom) / tilelat).floor();
    Bounds::new(left, bottom, left + tilelon, bottom + tilelat)
}
