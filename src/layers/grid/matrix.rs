use crate::core::{
    bounds::Bounds,
    geo::{Pixel, Size},
};
use crate::prelude::{HashMap, VecDeque};
use crate::tiles::{
    content::TileContent,
    tile::{Tile, TileEnv},
    types::TileId,
};

/// Rows of tiles, top row first, each row ordered west to east.
///
/// Tiles live in an arena keyed by [`TileId`]; the matrix only holds ids,
/// so a shift rotates ids between rows without touching the tiles
/// themselves. Ids are never reused within a grid.
#[derive(Debug, Default)]
pub struct TileGrid {
    rows: VecDeque<VecDeque<TileId>>,
    tiles: HashMap<TileId, Tile>,
    next_id: u64,
}

impl TileGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, cols)`; the matrix is always rectangular between operations
    pub fn dims(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.front().map_or(0, |row| row.len()))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn at(&self, row: usize, col: usize) -> Option<TileId> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(&id)
    }

    pub fn tile_at(&self, row: usize, col: usize) -> Option<&Tile> {
        self.at(row, col).and_then(|id| self.tiles.get(&id))
    }

    /// Row-major snapshot of the matrix
    pub fn ids(&self) -> Vec<Vec<TileId>> {
        self.rows
            .iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    /// Tiles in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter_map(move |id| self.tiles.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> + '_ {
        self.tiles.values_mut()
    }

    /// Union of all cells, from the top-left and bottom-right tiles
    pub fn tiles_bounds(&self) -> Option<Bounds> {
        let (rows, cols) = self.dims();
        if rows == 0 || cols == 0 {
            return None;
        }
        let first = self.tile_at(0, 0)?.bounds();
        let last = self.tile_at(rows - 1, cols - 1)?.bounds();
        Some(Bounds::new(first.left, last.bottom, last.right, first.top))
    }

    pub fn loading_count(&self) -> usize {
        self.tiles.values().filter(|tile| tile.is_loading()).count()
    }

    /// Puts a tile at `(row, col)` for the given cell, reusing whatever tile
    /// already sits there. A new tile is created from `prototype` only when
    /// the slot is empty. With `redraw` the cell is requested immediately,
    /// otherwise an existing tile just drops any fetch in flight.
    ///
    /// Returns the tile id and whether it was newly created.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        row: usize,
        col: usize,
        bounds: Bounds,
        position: Pixel,
        size: Size,
        redraw: bool,
        prototype: &dyn TileContent,
        env: &mut TileEnv<'_>,
    ) -> (TileId, bool) {
        while self.rows.len() <= row {
            self.rows.push_back(VecDeque::new());
        }

        if let Some(id) = self.at(row, col) {
            if let Some(tile) = self.tiles.get_mut(&id) {
                tile.set_size(size);
                tile.move_to(bounds, position, redraw, env);
            }
            return (id, false);
        }

        self.next_id += 1;
        let id = TileId(self.next_id);
        let mut tile = Tile::new(id, bounds, position, size, prototype.clone_box());
        if redraw {
            tile.draw(env);
        }
        self.tiles.insert(id, tile);
        self.rows[row].push_back(id);
        (id, true)
    }

    /// Destroys trailing rows, then trailing columns, until the matrix is
    /// at most `rows` x `cols`. Returns how many tiles were destroyed.
    pub fn remove_excess(&mut self, rows: usize, cols: usize, env: &mut TileEnv<'_>) -> usize {
        let mut removed = Vec::new();

        while self.rows.len() > rows {
            if let Some(row) = self.rows.pop_back() {
                removed.extend(row);
            }
        }
        for row in self.rows.iter_mut() {
            while row.len() > cols {
                if let Some(id) = row.pop_back() {
                    removed.push(id);
                }
            }
        }

        for id in &removed {
            if let Some(mut tile) = self.tiles.remove(id) {
                tile.destroy(env);
            }
        }
        removed.len()
    }

    /// Destroys every tile and empties the matrix
    pub fn clear(&mut self, env: &mut TileEnv<'_>) {
        for (_, mut tile) in self.tiles.drain() {
            tile.destroy(env);
        }
        self.rows.clear();
    }

    /// Moves the bottom row to the top (`prepend`) or the top row to the
    /// bottom, re-targeting its tiles one row beyond the current edge.
    pub fn shift_row(&mut self, prepend: bool, resolution: f64, tile_size: Size, env: &mut TileEnv<'_>) {
        let Some(model) = (if prepend { self.rows.front() } else { self.rows.back() }) else {
            return;
        };
        let targets = self.cells_of(model.iter());

        let delta_y = if prepend {
            -(tile_size.h as i32)
        } else {
            tile_size.h as i32
        };
        let delta_lat = resolution * -(delta_y as f64);

        let moved = if prepend {
            self.rows.pop_back()
        } else {
            self.rows.pop_front()
        };
        let Some(moved) = moved else {
            return;
        };

        for (id, (bounds, position)) in moved.iter().zip(targets) {
            if let Some(tile) = self.tiles.get_mut(id) {
                tile.move_to(
                    bounds.translate(0.0, delta_lat),
                    position.offset(0, delta_y),
                    true,
                    env,
                );
            }
        }

        if prepend {
            self.rows.push_front(moved);
        } else {
            self.rows.push_back(moved);
        }
    }

    /// Moves the rightmost column to the left (`prepend`) or the leftmost
    /// column to the right.
    pub fn shift_column(
        &mut self,
        prepend: bool,
        resolution: f64,
        tile_size: Size,
        env: &mut TileEnv<'_>,
    ) {
        let delta_x = if prepend {
            -(tile_size.w as i32)
        } else {
            tile_size.w as i32
        };
        let delta_lon = resolution * delta_x as f64;

        for r in 0..self.rows.len() {
            let row = &self.rows[r];
            let model = if prepend { row.front() } else { row.back() };
            let Some(&model) = model else {
                continue;
            };
            let Some((bounds, position)) = self.tiles.get(&model).map(|t| (t.bounds(), t.position()))
            else {
                continue;
            };

            let row = &mut self.rows[r];
            let moved = if prepend { row.pop_back() } else { row.pop_front() };
            let Some(moved) = moved else {
                continue;
            };

            if let Some(tile) = self.tiles.get_mut(&moved) {
                tile.move_to(
                    bounds.translate(delta_lon, 0.0),
                    position.offset(delta_x, 0),
                    true,
                    env,
                );
            }

            let row = &mut self.rows[r];
            if prepend {
                row.push_front(moved);
            } else {
                row.push_back(moved);
            }
        }
    }

    /// Marks the tile at `(row, col)` queued unless it already is
    pub(crate) fn claim(&mut self, row: usize, col: usize) -> Option<TileId> {
        let id = self.at(row, col)?;
        let tile = self.tiles.get_mut(&id)?;
        if tile.is_queued() {
            return None;
        }
        tile.set_queued(true);
        Some(id)
    }

    fn cells_of<'a>(&self, ids: impl Iterator<Item = &'a TileId>) -> Vec<(Bounds, Pixel)> {
        ids.filter_map(|id| self.tiles.get(id))
            .map(|tile| (tile.bounds(), tile.position()))
            .collect()
    }
}
