use std::fmt;
use std::time::Duration;

use crate::engine::tictactoe::{Board, GameStatus, Mark, TicTacToeGame, WinningLine};
use crate::identifiers::{RoomCode, TimerToken};
use crate::protocol::{ClientRequest, JoinError, ServerEvent};

use super::score::ScoreTally;
use super::types::{Mode, OnlineRoom, TimerKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SelectMode(Mode),
    PickMark(Mark),
    CellClicked(usize),
    NewGame,
    ResetScores,
    CreateRoom,
    /// Raw code as typed by the user.
    JoinRoom(String),
    LeaveRoom,
    Server(ServerEvent),
    ConnectionFailed(String),
    TimerFired(TimerToken),
}

/// Everything a renderer needs after a move or a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardView {
    pub board: Board,
    pub status: GameStatus,
    pub current_mark: Mark,
    pub last_move: Option<usize>,
    pub move_count: usize,
}

impl BoardView {
    pub fn of(game: &TicTacToeGame) -> Self {
        Self {
            board: *game.board(),
            status: game.status(),
            current_mark: game.current_mark(),
            last_move: game.last_move(),
            move_count: game.move_count(),
        }
    }

    pub fn winning_line(&self) -> Option<WinningLine> {
        self.status.winning_line()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Render(BoardView),
    Status(StatusMessage),
    Scores(ScoreTally),
    /// Room panel contents changed; `None` once the room is gone.
    Room(Option<OnlineRoom>),
    ShowMarkPicker,
    ScheduleTimer {
        token: TimerToken,
        kind: TimerKind,
        delay: Duration,
    },
    CancelTimer(TimerToken),
    Send(ClientRequest),
    /// Open the server connection if it is not open already.
    Connect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusMessage {
    ChooseMark,
    YourTurn,
    CpuThinking,
    LocalTurn { mark: Mark },
    OnlineYourTurn { mark: Mark },
    OnlineOpponentTurn { mark: Mark },
    YouWin,
    CpuWins,
    YouLose,
    PlayerWins { mark: Mark },
    Draw,
    CreateOrJoinRoom,
    WaitingForOpponent(RoomCode),
    JoiningRoom(RoomCode),
    JoinFailed(JoinError),
    OpponentLeft,
    OnlineUnavailable(String),
}

fn player_number(mark: Mark) -> u8 {
    if mark == Mark::O { 2 } else { 1 }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::ChooseMark => write!(f, "Choose your mark"),
            StatusMessage::YourTurn => write!(f, "Your turn"),
            StatusMessage::CpuThinking => write!(f, "CPU is thinking..."),
            StatusMessage::LocalTurn { mark } => {
                write!(f, "Player {} - {}'s turn", player_number(*mark), mark)
            }
            StatusMessage::OnlineYourTurn { mark } => write!(f, "Your turn - {}", mark),
            StatusMessage::OnlineOpponentTurn { mark } => write!(f, "Opponent's turn - {}", mark),
            StatusMessage::YouWin => write!(f, "You win!"),
            StatusMessage::CpuWins => write!(f, "CPU wins"),
            StatusMessage::YouLose => write!(f, "You lose"),
            StatusMessage::PlayerWins { mark } => write!(f, "Player {} wins!", player_number(*mark)),
            StatusMessage::Draw => write!(f, "Draw"),
            StatusMessage::CreateOrJoinRoom => write!(f, "Create or join a room"),
            StatusMessage::WaitingForOpponent(code) => {
                write!(f, "Room {}: waiting for opponent...", code)
            }
            StatusMessage::JoiningRoom(code) => write!(f, "Joining room {}...", code),
            StatusMessage::JoinFailed(error) => write!(f, "{}", error),
            StatusMessage::OpponentLeft => write!(f, "Opponent left the room"),
            StatusMessage::OnlineUnavailable(reason) => write!(f, "{}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wording() {
        assert_eq!(StatusMessage::LocalTurn { mark: Mark::O }.to_string(), "Player 2 - O's turn");
        assert_eq!(StatusMessage::PlayerWins { mark: Mark::X }.to_string(), "Player 1 wins!");
        assert_eq!(
            StatusMessage::JoinFailed(JoinError::RoomNotFound).to_string(),
            "Room not found"
        );
    }
}
