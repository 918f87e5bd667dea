//! The 3x3 playing grid and its occupancy queries.

use serde::{Deserialize, Serialize};

/// Width and height of the grid.
pub const GRID_SIZE: usize = 3;

/// Symbol stored in a grid cell.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    /// Nobody has played here yet.
    #[default]
    Empty,
    /// Mark of the player who moves first.
    First,
    /// Mark of the player who moves second.
    Second,
}

/// 3x3 grid addressed by column `x` and row `y`.
///
/// Only cells written through [`Grid::set`] are ever non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Cells in row-major order.
    cells: [Mark; GRID_SIZE * GRID_SIZE],
}

impl Grid {
    /// Creates an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when both coordinates lie inside the grid.
    pub fn coordinates_valid(x: usize, y: usize) -> bool {
        x < GRID_SIZE && y < GRID_SIZE
    }

    /// Stores `mark` at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the grid. Callers validate with
    /// [`Grid::coordinates_valid`] first.
    pub fn set(&mut self, x: usize, y: usize, mark: Mark) {
        self.cells[Self::index(x, y)] = mark;
    }

    /// Returns the mark at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Mark {
        self.cells[Self::index(x, y)]
    }

    /// Returns true if nobody has played at `(x, y)`.
    pub fn is_empty(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == Mark::Empty
    }

    /// Returns true if row `y` holds three equal, non-empty marks.
    pub fn row_filled(&self, y: usize) -> bool {
        self.same_mark([(0, y), (1, y), (2, y)])
    }

    /// Returns true if column `x` holds three equal, non-empty marks.
    pub fn column_filled(&self, x: usize) -> bool {
        self.same_mark([(x, 0), (x, 1), (x, 2)])
    }

    /// Checks (0,0), (1,1), (2,2).
    pub fn diagonal_down_filled(&self) -> bool {
        self.same_mark([(0, 0), (1, 1), (2, 2)])
    }

    /// Checks (0,2), (1,1), (2,0).
    pub fn diagonal_up_filled(&self) -> bool {
        self.same_mark([(0, 2), (1, 1), (2, 0)])
    }

    /// Returns true when no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.empty_cells().next().is_none()
    }

    /// Iterates over the coordinates of every empty cell in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == Mark::Empty)
            .map(|(i, _)| (i % GRID_SIZE, i / GRID_SIZE))
    }

    /// Formats the grid as three lines of `X`, `O` and `.`.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                result.push(match self.get(x, y) {
                    Mark::Empty => '.',
                    Mark::First => 'X',
                    Mark::Second => 'O',
                });
            }
            if y + 1 < GRID_SIZE {
                result.push('\n');
            }
        }
        result
    }

    fn same_mark(&self, line: [(usize, usize); 3]) -> bool {
        let [a, b, c] = line.map(|(x, y)| self.get(x, y));
        a != Mark::Empty && a == b && a == c
    }

    fn index(x: usize, y: usize) -> usize {
        assert!(
            Self::coordinates_valid(x, y),
            "cell ({x}, {y}) is outside the grid"
        );
        y * GRID_SIZE + x
    }
}
