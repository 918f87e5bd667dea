//! Compression of the empty cells into axis-aligned ranges.
//!
//! Rather than listing every empty cell (nine of them right after creation),
//! events carry a short list of rectangles whose union is exactly the set of
//! empty cells. The covering is greedy: cells are scanned column by column,
//! top to bottom, and each unvisited empty cell anchors the widest rectangle
//! whose height is the empty run below it in its own column. The result is
//! exact and non-overlapping but not guaranteed to be minimal.

use crate::grid::{GRID_SIZE, Grid, Mark};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A block of empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveRange {
    /// A single empty cell.
    Cell {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },
    /// An inclusive rectangle covering more than one cell.
    Rectangle {
        /// Left column.
        from_x: usize,
        /// Top row.
        from_y: usize,
        /// Right column, inclusive.
        to_x: usize,
        /// Bottom row, inclusive.
        to_y: usize,
    },
}

impl MoveRange {
    /// Builds a range from inclusive corners, collapsing to [`MoveRange::Cell`]
    /// when both corners coincide.
    pub fn from_corners(from_x: usize, from_y: usize, to_x: usize, to_y: usize) -> Self {
        if from_x == to_x && from_y == to_y {
            MoveRange::Cell {
                x: from_x,
                y: from_y,
            }
        } else {
            MoveRange::Rectangle {
                from_x,
                from_y,
                to_x,
                to_y,
            }
        }
    }

    /// Inclusive corners `(from_x, from_y, to_x, to_y)`.
    pub fn corners(&self) -> (usize, usize, usize, usize) {
        match *self {
            MoveRange::Cell { x, y } => (x, y, x, y),
            MoveRange::Rectangle {
                from_x,
                from_y,
                to_x,
                to_y,
            } => (from_x, from_y, to_x, to_y),
        }
    }

    /// Returns true if `(x, y)` lies inside the range.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        let (fx, fy, tx, ty) = self.corners();
        (fx..=tx).contains(&x) && (fy..=ty).contains(&y)
    }

    /// Every cell covered, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (fx, fy, tx, ty) = self.corners();
        (fx..=tx).flat_map(move |x| (fy..=ty).map(move |y| (x, y)))
    }

    /// Number of cells covered; at least one.
    pub fn cell_count(&self) -> usize {
        let (fx, fy, tx, ty) = self.corners();
        (tx - fx + 1) * (ty - fy + 1)
    }

    /// Quadruple understood by legacy consumers, where `(to_x, to_y) == (0, 0)`
    /// marks a single cell at `(from_x, from_y)`.
    pub fn legacy_encoding(&self) -> [u32; 4] {
        match *self {
            MoveRange::Cell { x, y } => [x as u32, y as u32, 0, 0],
            MoveRange::Rectangle {
                from_x,
                from_y,
                to_x,
                to_y,
            } => [from_x as u32, from_y as u32, to_x as u32, to_y as u32],
        }
    }
}

/// Covers the empty cells of `grid` with non-overlapping ranges.
///
/// Works on a private copy; `grid` is never touched.
#[instrument(skip(grid))]
pub fn compress(grid: &Grid) -> Vec<MoveRange> {
    let mut visited = grid.clone();
    let mut ranges = Vec::new();
    for x in 0..GRID_SIZE {
        for y in 0..GRID_SIZE {
            if !visited.is_empty(x, y) {
                continue;
            }
            let end_y = vertical_run_end(&visited, x, y);
            let end_x = horizontal_extent(&visited, x, y, end_y);
            let range = MoveRange::from_corners(x, y, end_x, end_y);
            for (cx, cy) in range.cells() {
                visited.set(cx, cy, Mark::First);
            }
            ranges.push(range);
        }
    }
    ranges
}

/// Last row of the empty run starting at `(x, y)`.
fn vertical_run_end(grid: &Grid, x: usize, y: usize) -> usize {
    (y..GRID_SIZE)
        .take_while(|&row| grid.is_empty(x, row))
        .last()
        .unwrap_or(y)
}

/// Last column, starting at `x`, whose rows `y..=end_y` are all empty.
fn horizontal_extent(grid: &Grid, x: usize, y: usize, end_y: usize) -> usize {
    (x..GRID_SIZE)
        .take_while(|&col| (y..=end_y).all(|row| grid.is_empty(col, row)))
        .last()
        .unwrap_or(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid_from(occupied: &[(usize, usize)]) -> Grid {
        let mut grid = Grid::new();
        for &(x, y) in occupied {
            grid.set(x, y, Mark::Second);
        }
        grid
    }

    fn coverage(ranges: &[MoveRange]) -> [[u8; GRID_SIZE]; GRID_SIZE] {
        let mut hits = [[0u8; GRID_SIZE]; GRID_SIZE];
        for range in ranges {
            for (x, y) in range.cells() {
                hits[x][y] += 1;
            }
        }
        hits
    }

    #[test]
    fn test_empty_grid_is_one_rectangle() {
        let ranges = compress(&Grid::new());
        assert_eq!(ranges, vec![MoveRange::from_corners(0, 0, 2, 2)]);
        assert_eq!(ranges[0].cell_count(), 9);
    }

    #[test]
    fn test_full_grid_has_no_ranges() {
        let mut grid = Grid::new();
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                grid.set(x, y, Mark::First);
            }
        }
        assert!(compress(&grid).is_empty());
    }

    #[test]
    fn test_corner_taken() {
        let ranges = compress(&grid_from(&[(0, 0)]));
        assert_eq!(
            ranges,
            vec![
                MoveRange::from_corners(0, 1, 2, 2),
                MoveRange::from_corners(1, 0, 2, 0),
            ]
        );
    }

    #[test]
    fn test_center_taken() {
        let ranges = compress(&grid_from(&[(1, 1)]));
        assert_eq!(
            ranges,
            vec![
                MoveRange::from_corners(0, 0, 0, 2),
                MoveRange::from_corners(1, 0, 2, 0),
                MoveRange::from_corners(1, 2, 2, 2),
                MoveRange::Cell { x: 2, y: 1 },
            ]
        );
    }

    #[test]
    fn test_single_cell_uses_cell_variant() {
        let mut occupied = Vec::new();
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                if (x, y) != (0, 0) {
                    occupied.push((x, y));
                }
            }
        }
        let ranges = compress(&grid_from(&occupied));
        assert_eq!(ranges, vec![MoveRange::Cell { x: 0, y: 0 }]);
        assert_eq!(ranges[0].legacy_encoding(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_compress_does_not_mutate_grid() {
        let grid = grid_from(&[(2, 2)]);
        let before = grid.clone();
        let _ = compress(&grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_legacy_encoding_of_rectangle() {
        let range = MoveRange::from_corners(1, 0, 2, 2);
        assert_eq!(range.legacy_encoding(), [1, 0, 2, 2]);
        assert!(range.contains(2, 1));
        assert!(!range.contains(0, 1));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(MoveRange::Cell { x: 2, y: 1 }).expect("serialize");
        assert_eq!(json, serde_json::json!({ "kind": "cell", "x": 2, "y": 1 }));
    }

    proptest! {
        #[test]
        fn prop_ranges_cover_exactly_the_empty_cells(mask in 0u16..512) {
            let occupied: Vec<_> = (0..GRID_SIZE * GRID_SIZE)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| (i % GRID_SIZE, i / GRID_SIZE))
                .collect();
            let grid = grid_from(&occupied);
            let hits = coverage(&compress(&grid));
            for x in 0..GRID_SIZE {
                for y in 0..GRID_SIZE {
                    let expected = u8::from(grid.is_empty(x, y));
                    prop_assert_eq!(hits[x][y], expected, "cell ({}, {})", x, y);
                }
            }
        }
    }
}
