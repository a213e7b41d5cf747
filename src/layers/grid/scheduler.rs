//! Load ordering and load accounting for a grid.
//!
//! Tiles are requested center-out: the walk starts on the center-most cell
//! and spirals outwards (right, down, left, up) with arm lengths 1, 1, 2,
//! 2, 3, 3 and so on. Cells off the grid are skipped. Even sizes start on
//! the upper-left of the middle cells.

use crate::prelude::VecDeque;
use crate::tiles::types::{GridEvent, TileEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    fn turn(self) -> Self {
        match self {
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Up => Direction::Right,
        }
    }

    fn step(self, row: i64, col: i64) -> (i64, i64) {
        match self {
            Direction::Right => (row, col + 1),
            Direction::Down => (row + 1, col),
            Direction::Left => (row, col - 1),
            Direction::Up => (row - 1, col),
        }
    }
}

/// Walks a `rows` x `cols` grid in an outward spiral and returns the
/// claimed items in visit order, center-most first.
///
/// `claim` is offered every cell exactly once; it returns `None` for cells
/// that are already queued, which are left out. The walk ends once every
/// cell has been offered.
pub fn spiral_walk<T>(
    rows: usize,
    cols: usize,
    mut claim: impl FnMut(usize, usize) -> Option<T>,
) -> VecDeque<T> {
    let total = rows * cols;
    let mut queue = VecDeque::with_capacity(total);
    if total == 0 {
        return queue;
    }

    let (mut row, mut col) = (((rows - 1) / 2) as i64, ((cols - 1) / 2) as i64);
    queue.extend(claim(row as usize, col as usize));
    let mut offered = 1;

    let mut direction = Direction::Right;
    let mut arm = 1;
    while offered < total {
        // Two arms per length
        for _ in 0..2 {
            for _ in 0..arm {
                (row, col) = direction.step(row, col);
                let in_range =
                    row >= 0 && col >= 0 && (row as usize) < rows && (col as usize) < cols;
                if in_range {
                    offered += 1;
                    queue.extend(claim(row as usize, col as usize));
                }
            }
            direction = direction.turn();
        }
        arm += 1;
    }

    queue
}

/// Counts tiles with a fetch in flight. Only tile lifecycle events move it.
#[derive(Debug, Clone, Default)]
pub struct LoadAccounting {
    loading: usize,
}

impl LoadAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loading(&self) -> usize {
        self.loading
    }

    pub fn apply(&mut self, event: TileEvent) {
        match event {
            TileEvent::LoadStart => self.loading += 1,
            TileEvent::Reload => {}
            TileEvent::LoadEnd { .. } | TileEvent::Unload => {
                if self.loading == 0 {
                    log::warn!("load counter underflow on {:?}", event);
                } else {
                    self.loading -= 1;
                }
            }
        }
    }
}

/// Edge notification for a counter change from `before` to `after`
pub fn load_edge(before: usize, after: usize) -> Option<GridEvent> {
    match (before, after) {
        (0, n) if n > 0 => Some(GridEvent::LoadStart),
        (n, 0) if n > 0 => Some(GridEvent::AllLoaded),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(rows: usize, cols: usize) -> Vec<(usize, usize)> {
        let mut taken = vec![vec![false; cols]; rows];
        spiral_walk(rows, cols, |r, c| {
            if taken[r][c] {
                None
            } else {
                taken[r][c] = true;
                Some((r, c))
            }
        })
        .into_iter()
        .collect()
    }

    #[test]
    fn test_three_by_three_starts_in_center() {
        assert_eq!(
            order(3, 3),
            vec![
                (1, 1),
                (1, 2),
                (2, 2),
                (2, 1),
                (2, 0),
                (1, 0),
                (0, 0),
                (0, 1),
                (0, 2)
            ]
        );
    }

    #[test]
    fn test_single_cell() {
        assert_eq!(order(1, 1), vec![(0, 0)]);
        assert!(order(0, 0).is_empty());
    }

    #[test]
    fn test_every_cell_visited_once() {
        for rows in 1..7 {
            for cols in 1..7 {
                let visited = order(rows, cols);
                assert_eq!(visited.len(), rows * cols, "{}x{}", rows, cols);

                let mut sorted = visited.clone();
                sorted.sort();
                sorted.dedup();
                assert_eq!(sorted.len(), rows * cols);
            }
        }
    }

    fn distance_from_center(rows: usize, cols: usize, (r, c): (usize, usize)) -> f64 {
        let center = ((rows as f64 - 1.0) / 2.0, (cols as f64 - 1.0) / 2.0);
        (r as f64 - center.0).hypot(c as f64 - center.1)
    }

    #[test]
    fn test_first_cell_is_center_most() {
        for (rows, cols) in [(1, 5), (2, 4), (3, 5), (4, 6), (5, 5), (6, 2), (7, 1)] {
            let visited = order(rows, cols);
            let first = distance_from_center(rows, cols, visited[0]);
            for &cell in &visited {
                assert!(
                    first <= distance_from_center(rows, cols, cell),
                    "{}x{} starts at {:?}, {:?} is closer",
                    rows,
                    cols,
                    visited[0],
                    cell
                );
            }
        }
        assert_eq!(order(1, 5)[0], (0, 2));
        assert_eq!(order(2, 4)[0], (0, 1));
        assert_eq!(order(3, 5)[0], (1, 2));
        assert_eq!(order(4, 6)[0], (1, 2));
    }

    #[test]
    fn test_already_queued_cells_are_skipped() {
        let visited: Vec<_> = spiral_walk(3, 3, |r, c| (r != 1 || c == 1).then_some((r, c)))
            .into_iter()
            .collect();
        assert_eq!(visited.len(), 7);
        assert_eq!(visited[0], (1, 1));
        assert!(!visited.contains(&(1, 0)));
        assert!(!visited.contains(&(1, 2)));
    }

    #[test]
    fn test_load_accounting_edges() {
        let mut accounting = LoadAccounting::new();
        let before = accounting.loading();
        accounting.apply(TileEvent::LoadStart);
        accounting.apply(TileEvent::LoadStart);
        accounting.apply(TileEvent::Reload);
        assert_eq!(accounting.loading(), 2);
        assert_eq!(load_edge(before, accounting.loading()), Some(GridEvent::LoadStart));

        accounting.apply(TileEvent::LoadEnd { failed: true });
        assert_eq!(load_edge(2, accounting.loading()), None);
        accounting.apply(TileEvent::Unload);
        assert_eq!(load_edge(1, accounting.loading()), Some(GridEvent::AllLoaded));

        // Never goes below zero
        accounting.apply(TileEvent::Unload);
        assert_eq!(accounting.loading(), 0);
        assert_eq!(load_edge(0, 0), None);
    }
}
