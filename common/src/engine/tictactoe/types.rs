use std::fmt;

pub const CELL_COUNT: usize = 9;

/// Short names of the cells in row-major order, used by move logs.
pub const POSITION_NAMES: [&str; CELL_COUNT] = ["TL", "TC", "TR", "ML", "MC", "MR", "BL", "BC", "BR"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    Empty,
    X,
    O,
}

impl Mark {
    pub fn opponent(&self) -> Option<Mark> {
        match self {
            Mark::X => Some(Mark::O),
            Mark::O => Some(Mark::X),
            Mark::Empty => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Mark::Empty => '.',
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WinningLine([usize; 3]);

impl WinningLine {
    pub const fn new(cells: [usize; 3]) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> [usize; 3] {
        self.0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }
}

impl fmt::Display for WinningLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.0[0], self.0[1], self.0[2])
    }
}

/// Rows, then columns, then the two diagonals.
pub const WINNING_LINES: [WinningLine; 8] = [
    WinningLine::new([0, 1, 2]),
    WinningLine::new([3, 4, 5]),
    WinningLine::new([6, 7, 8]),
    WinningLine::new([0, 3, 6]),
    WinningLine::new([1, 4, 7]),
    WinningLine::new([2, 5, 8]),
    WinningLine::new([0, 4, 8]),
    WinningLine::new([2, 4, 6]),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Won { mark: Mark, line: WinningLine },
    Draw,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self {
            GameStatus::Won { mark, .. } => Some(*mark),
            _ => None,
        }
    }

    pub fn winning_line(&self) -> Option<WinningLine> {
        match self {
            GameStatus::Won { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveRejected {
    OutOfBounds(usize),
    CellOccupied(usize),
    EmptyMark,
    GameOver,
}

impl fmt::Display for MoveRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejected::OutOfBounds(index) => write!(f, "Cell {} is out of bounds", index),
            MoveRejected::CellOccupied(index) => write!(f, "Cell {} is already marked", index),
            MoveRejected::EmptyMark => write!(f, "Cannot place an empty mark"),
            MoveRejected::GameOver => write!(f, "Game is already over"),
        }
    }
}

impl std::error::Error for MoveRejected {}
