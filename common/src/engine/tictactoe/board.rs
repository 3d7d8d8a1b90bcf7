use std::fmt;

use super::types::{CELL_COUNT, GameStatus, Mark, MoveRejected};
use super::win_detector;

/// 3×3 grid in row-major order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Mark; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [Mark::Empty; CELL_COUNT],
        }
    }

    pub fn from_cells(cells: [Mark; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Mark; CELL_COUNT] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<Mark> {
        self.cells.get(index).copied()
    }

    pub fn is_cell_empty(&self, index: usize) -> bool {
        self.cell(index) == Some(Mark::Empty)
    }

    pub fn available_moves(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Mark::Empty)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|&&cell| cell == mark).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&cell| cell != Mark::Empty)
    }

    /// Mark expected to move next, with X always opening.
    pub fn next_mark(&self) -> Mark {
        if self.count(Mark::X) > self.count(Mark::O) {
            Mark::O
        } else {
            Mark::X
        }
    }

    pub fn evaluate(&self) -> GameStatus {
        win_detector::evaluate(self)
    }

    /// Returns a copy with `mark` placed at `index`; `self` is left untouched.
    pub fn apply_move(&self, index: usize, mark: Mark) -> Result<Board, MoveRejected> {
        if index >= CELL_COUNT {
            return Err(MoveRejected::OutOfBounds(index));
        }
        if mark == Mark::Empty {
            return Err(MoveRejected::EmptyMark);
        }
        if self.evaluate().is_terminal() {
            return Err(MoveRejected::GameOver);
        }
        if self.cells[index] != Mark::Empty {
            return Err(MoveRejected::CellOccupied(index));
        }

        let mut next = *self;
        next.cells[index] = mark;
        Ok(next)
    }

    pub(crate) fn set(&mut self, index: usize, mark: Mark) {
        self.cells[index] = mark;
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            writeln!(f, " {} | {} | {} ", chunk[0], chunk[1], chunk[2])?;
        }
        Ok(())
    }
}
