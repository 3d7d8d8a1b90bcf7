use super::board::Board;
use super::types::{GameStatus, Mark, WINNING_LINES, WinningLine};

pub fn check_win(board: &Board) -> Option<Mark> {
    check_win_with_line(board).map(|(mark, _)| mark)
}

/// First complete line in canonical order. On a board reachable by legal play
/// at most one mark can own a complete line, so the order never changes the
/// winner.
pub fn check_win_with_line(board: &Board) -> Option<(Mark, WinningLine)> {
    WINNING_LINES.iter().find_map(|line| {
        let [a, b, c] = line.cells();
        let mark = board.cells()[a];
        if mark != Mark::Empty && board.cells()[b] == mark && board.cells()[c] == mark {
            Some((mark, *line))
        } else {
            None
        }
    })
}

pub fn has_win(board: &Board, mark: Mark) -> bool {
    WINNING_LINES
        .iter()
        .any(|line| line.cells().iter().all(|&i| board.cells()[i] == mark))
}

pub fn evaluate(board: &Board) -> GameStatus {
    if let Some((mark, line)) = check_win_with_line(board) {
        return GameStatus::Won { mark, line };
    }

    if board.is_full() {
        GameStatus::Draw
    } else {
        GameStatus::InProgress
    }
}
