use super::board::Board;
use super::types::Mark;
use super::win_detector::has_win;

const WIN_SCORE: i32 = 10;

/// Optimal move for `ai_mark` by exhaustive minimax with alpha-beta pruning.
///
/// Terminal positions score `10 - depth` for an AI win, `depth - 10` for a
/// loss and `0` for a draw, which prefers quicker wins and slower losses.
/// Candidates are tried in increasing index order and only a strictly better
/// score replaces the current choice, so ties go to the lowest index.
/// Returns `None` only when the board has no empty cell.
pub fn best_move(board: &Board, ai_mark: Mark, human_mark: Mark) -> Option<usize> {
    let mut board = *board;
    let mut best_score = i32::MIN;
    let mut best = None;

    for index in board.available_moves() {
        board.set(index, ai_mark);
        let score = minimax(&mut board, ai_mark, human_mark, 0, false, i32::MIN, i32::MAX);
        board.set(index, Mark::Empty);

        if score > best_score {
            best_score = score;
            best = Some(index);
        }
    }

    best
}

fn minimax(
    board: &mut Board,
    ai_mark: Mark,
    human_mark: Mark,
    depth: i32,
    is_maximizing: bool,
    mut alpha: i32,
    mut beta: i32,
) -> i32 {
    if has_win(board, ai_mark) {
        return WIN_SCORE - depth;
    }
    if has_win(board, human_mark) {
        return depth - WIN_SCORE;
    }
    if board.is_full() {
        return 0;
    }

    if is_maximizing {
        let mut best = i32::MIN;
        for index in board.available_moves() {
            board.set(index, ai_mark);
            best = best.max(minimax(board, ai_mark, human_mark, depth + 1, false, alpha, beta));
            board.set(index, Mark::Empty);

            alpha = alpha.max(best);
            if beta <= alpha {
                break;
            }
        }
        best
    } else {
        let mut best = i32::MAX;
        for index in board.available_moves() {
            board.set(index, human_mark);
            best = best.min(minimax(board, ai_mark, human_mark, depth + 1, true, alpha, beta));
            board.set(index, Mark::Empty);

            beta = beta.min(best);
            if beta <= alpha {
                break;
            }
        }
        best
    }
}
