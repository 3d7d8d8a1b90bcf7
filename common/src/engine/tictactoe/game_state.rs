use super::board::Board;
use super::types::{GameStatus, Mark, MoveRejected};

/// One game from the empty board to a terminal status. X always opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToeGame {
    board: Board,
    current_mark: Mark,
    status: GameStatus,
    move_count: usize,
    last_move: Option<usize>,
}

impl Default for TicTacToeGame {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToeGame {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_mark: Mark::X,
            status: GameStatus::InProgress,
            move_count: 0,
            last_move: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_mark(&self) -> Mark {
        self.current_mark
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    pub fn last_move(&self) -> Option<usize> {
        self.last_move
    }

    pub fn is_over(&self) -> bool {
        self.status.is_terminal()
    }

    /// Places the current mark. The turn only passes while the game is still
    /// in progress, so after a win `current_mark` is the winner's mark.
    pub fn place_mark(&mut self, index: usize) -> Result<GameStatus, MoveRejected> {
        if self.status.is_terminal() {
            return Err(MoveRejected::GameOver);
        }

        self.board = self.board.apply_move(index, self.current_mark)?;
        self.move_count += 1;
        self.last_move = Some(index);
        self.status = self.board.evaluate();

        if !self.status.is_terminal()
            && let Some(next) = self.current_mark.opponent()
        {
            self.current_mark = next;
        }

        Ok(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tictactoe::WinningLine;

    #[test]
    fn test_turns_alternate_from_x() {
        let mut game = TicTacToeGame::new();
        assert_eq!(game.current_mark(), Mark::X);
        game.place_mark(4).unwrap();
        assert_eq!(game.current_mark(), Mark::O);
        assert_eq!(game.board().cell(4), Some(Mark::X));
        game.place_mark(0).unwrap();
        assert_eq!(game.current_mark(), Mark::X);
        assert_eq!(game.move_count(), 2);
        assert_eq!(game.last_move(), Some(0));
    }

    #[test]
    fn test_rejected_move_keeps_turn() {
        let mut game = TicTacToeGame::new();
        game.place_mark(4).unwrap();
        assert_eq!(game.place_mark(4), Err(MoveRejected::CellOccupied(4)));
        assert_eq!(game.current_mark(), Mark::O);
        assert_eq!(game.move_count(), 1);
    }

    #[test]
    fn test_win_freezes_game() {
        let mut game = TicTacToeGame::new();
        for index in [4, 0, 3, 1] {
            assert_eq!(game.place_mark(index), Ok(GameStatus::InProgress));
        }
        let status = game.place_mark(5).unwrap();
        assert_eq!(
            status,
            GameStatus::Won { mark: Mark::X, line: WinningLine::new([3, 4, 5]) }
        );
        assert!(game.is_over());
        assert_eq!(game.current_mark(), Mark::X);
        assert_eq!(game.place_mark(8), Err(MoveRejected::GameOver));
    }
}
