use std::fmt;
use std::time::Duration;

use crate::engine::tictactoe::Mark;
use crate::identifiers::RoomCode;

pub const DEFAULT_AI_FIRST_MOVE_DELAY: Duration = Duration::from_millis(450);
pub const DEFAULT_AI_REPLY_DELAY: Duration = Duration::from_millis(380);
pub const DEFAULT_AUTO_RESTART_DELAY: Duration = Duration::from_millis(2200);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Cpu,
    Local,
    Online,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Cpu => write!(f, "cpu"),
            Mode::Local => write!(f, "local"),
            Mode::Online => write!(f, "online"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No mode selected yet.
    Idle,
    PickingMark,
    /// Online, not yet paired: create/join/leave are the only actions.
    WaitingForRoom,
    /// Online mode without a usable connection.
    Unavailable,
    InProgress,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomRole {
    Host,
    Guest,
}

impl RoomRole {
    /// Host plays X and opens every game in the room.
    pub fn mark(&self) -> Mark {
        match self {
            RoomRole::Host => Mark::X,
            RoomRole::Guest => Mark::O,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnlineRoom {
    pub code: RoomCode,
    pub role: RoomRole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    AiMove,
    AutoRestart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTimings {
    /// Thinking delay before the AI opens a game.
    pub ai_first_move_delay: Duration,
    /// Thinking delay before the AI answers a human move.
    pub ai_reply_delay: Duration,
    pub auto_restart_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            ai_first_move_delay: DEFAULT_AI_FIRST_MOVE_DELAY,
            ai_reply_delay: DEFAULT_AI_REPLY_DELAY,
            auto_restart_delay: DEFAULT_AUTO_RESTART_DELAY,
        }
    }
}
