use std::time::Duration;

use crate::engine::tictactoe::{GameStatus, Mark, TicTacToeGame, best_move};
use crate::identifiers::{RoomCode, TimerToken};
use crate::log;
use crate::proto::ErrorCode;
use crate::protocol::{ClientRequest, ServerEvent};

use super::events::{BoardView, Effect, SessionEvent, StatusMessage};
use super::score::{Participant, ScoreTally};
use super::types::{Mode, OnlineRoom, Phase, RoomRole, SessionTimings, TimerKind};

/// Join codes shorter than this are ignored before reaching the server.
const MIN_JOIN_CODE_LENGTH: usize = 3;

/// Room request sent to the server and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingRoomRequest {
    Create,
    Join(RoomCode),
}

/// One live game plus its input lock and pending continuations.
#[derive(Debug)]
struct Session {
    game: TicTacToeGame,
    locked: bool,
    ai_timer: Option<TimerToken>,
    restart_timer: Option<TimerToken>,
}

impl Session {
    fn new(locked: bool) -> Self {
        Self {
            game: TicTacToeGame::new(),
            locked,
            ai_timer: None,
            restart_timer: None,
        }
    }

    fn pending_timers(&self) -> impl Iterator<Item = TimerToken> {
        self.ai_timer.into_iter().chain(self.restart_timer)
    }
}

#[derive(Debug)]
pub struct SessionCoordinator {
    timings: SessionTimings,
    mode: Option<Mode>,
    phase: Phase,
    session: Option<Session>,
    /// Mark played from this client: picked in CPU mode, X in Local mode,
    /// derived from the room role online.
    local_mark: Mark,
    scores: ScoreTally,
    room: Option<OnlineRoom>,
    pending_request: Option<PendingRoomRequest>,
    next_timer: u64,
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new(SessionTimings::default())
    }
}

impl SessionCoordinator {
    pub fn new(timings: SessionTimings) -> Self {
        Self {
            timings,
            mode: None,
            phase: Phase::Idle,
            session: None,
            local_mark: Mark::X,
            scores: ScoreTally::default(),
            room: None,
            pending_request: None,
            next_timer: 1,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scores(&self) -> ScoreTally {
        self.scores
    }

    pub fn room(&self) -> Option<&OnlineRoom> {
        self.room.as_ref()
    }

    pub fn local_mark(&self) -> Mark {
        self.local_mark
    }

    pub fn game(&self) -> Option<&TicTacToeGame> {
        self.session.as_ref().map(|session| &session.game)
    }

    /// Input is locked whenever there is no session or it is not the local
    /// participant's turn.
    pub fn is_input_locked(&self) -> bool {
        self.session.as_ref().is_none_or(|session| session.locked)
    }

    pub fn pending_timers(&self) -> Vec<TimerToken> {
        self.session
            .as_ref()
            .map(|session| session.pending_timers().collect())
            .unwrap_or_default()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            SessionEvent::SelectMode(mode) => self.select_mode(mode, &mut effects),
            SessionEvent::PickMark(mark) => self.pick_mark(mark, &mut effects),
            SessionEvent::CellClicked(index) => self.cell_clicked(index, &mut effects),
            SessionEvent::NewGame => self.new_game(&mut effects),
            SessionEvent::ResetScores => {
                self.scores = ScoreTally::default();
                effects.push(Effect::Scores(self.scores));
            }
            SessionEvent::CreateRoom => self.create_room(&mut effects),
            SessionEvent::JoinRoom(code) => self.join_room(&code, &mut effects),
            SessionEvent::LeaveRoom => {
                if self.mode == Some(Mode::Online) && self.phase != Phase::Unavailable {
                    self.leave_room(&mut effects);
                    self.phase = Phase::WaitingForRoom;
                    effects.push(Effect::Status(StatusMessage::CreateOrJoinRoom));
                }
            }
            SessionEvent::Server(server_event) => self.server_event(server_event, &mut effects),
            SessionEvent::ConnectionFailed(reason) => self.connection_failed(reason, &mut effects),
            SessionEvent::TimerFired(token) => self.timer_fired(token, &mut effects),
        }

        effects
    }

    fn select_mode(&mut self, mode: Mode, effects: &mut Vec<Effect>) {
        if self.mode == Some(mode) {
            return;
        }

        if self.mode == Some(Mode::Online) {
            self.leave_room(effects);
            self.pending_request = None;
        }
        self.discard_session(effects);

        log!("Switching to {} mode", mode);
        self.mode = Some(mode);
        self.scores = ScoreTally::default();
        effects.push(Effect::Scores(self.scores));

        match mode {
            Mode::Cpu => self.show_mark_picker(effects),
            Mode::Local => {
                self.local_mark = Mark::X;
                self.start_local_game(effects);
            }
            Mode::Online => {
                self.phase = Phase::WaitingForRoom;
                effects.push(Effect::Connect);
                effects.push(Effect::Status(StatusMessage::CreateOrJoinRoom));
            }
        }
    }

    fn pick_mark(&mut self, mark: Mark, effects: &mut Vec<Effect>) {
        if self.mode != Some(Mode::Cpu) || self.phase != Phase::PickingMark {
            return;
        }
        if mark == Mark::Empty {
            return;
        }

        self.local_mark = mark;
        self.start_cpu_game(effects);
    }

    fn cell_clicked(&mut self, index: usize, effects: &mut Vec<Effect>) {
        if self.phase != Phase::InProgress {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.locked || !session.game.board().is_cell_empty(index) {
            return;
        }
        let turn = session.game.current_mark();

        match self.mode {
            Some(Mode::Cpu) => {
                if turn != self.local_mark {
                    return;
                }
                let Some(status) = self.place(index, effects) else {
                    return;
                };
                if status.is_terminal() {
                    self.end_game(status, effects);
                } else {
                    self.schedule_ai_move(self.timings.ai_reply_delay, effects);
                }
            }
            Some(Mode::Local) => {
                let Some(status) = self.place(index, effects) else {
                    return;
                };
                if status.is_terminal() {
                    self.end_game(status, effects);
                } else if let Some(session) = self.session.as_ref() {
                    effects.push(Effect::Status(StatusMessage::LocalTurn {
                        mark: session.game.current_mark(),
                    }));
                }
            }
            Some(Mode::Online) => {
                if turn != self.local_mark {
                    return;
                }
                let Some(status) = self.place(index, effects) else {
                    return;
                };
                effects.push(Effect::Send(ClientRequest::Move(index)));
                if status.is_terminal() {
                    self.end_game(status, effects);
                } else {
                    self.set_locked(true);
                    effects.push(Effect::Status(StatusMessage::OnlineOpponentTurn {
                        mark: turn.opponent().unwrap_or(Mark::O),
                    }));
                }
            }
            None => {}
        }
    }

    fn new_game(&mut self, effects: &mut Vec<Effect>) {
        match self.mode {
            Some(Mode::Cpu) => {
                self.discard_session(effects);
                self.show_mark_picker(effects);
            }
            Some(Mode::Local) => self.start_local_game(effects),
            Some(Mode::Online) => {
                if self.room.is_some() && self.session.is_some() {
                    effects.push(Effect::Send(ClientRequest::RequestRematch));
                    self.start_online_game(effects);
                }
            }
            None => {}
        }
    }

    /// Room requests are accepted only while waiting for a room with no
    /// earlier request still unanswered.
    fn can_request_room(&self) -> bool {
        self.mode == Some(Mode::Online)
            && self.phase == Phase::WaitingForRoom
            && self.room.is_none()
            && self.pending_request.is_none()
    }

    fn create_room(&mut self, effects: &mut Vec<Effect>) {
        if !self.can_request_room() {
            return;
        }
        self.pending_request = Some(PendingRoomRequest::Create);
        effects.push(Effect::Send(ClientRequest::CreateRoom));
    }

    fn join_room(&mut self, raw_code: &str, effects: &mut Vec<Effect>) {
        if !self.can_request_room() {
            return;
        }
        let code = RoomCode::normalize(raw_code);
        if code.len() < MIN_JOIN_CODE_LENGTH {
            return;
        }
        self.pending_request = Some(PendingRoomRequest::Join(code.clone()));
        effects.push(Effect::Send(ClientRequest::JoinRoom(code)));
    }

    fn server_event(&mut self, event: ServerEvent, effects: &mut Vec<Effect>) {
        if self.mode != Some(Mode::Online) {
            // A room ack that lands after the user switched away would leave
            // a room registered on the server with nobody looking at it.
            if matches!(event, ServerEvent::RoomCreated(_) | ServerEvent::JoinAccepted(_)) {
                effects.push(Effect::Send(ClientRequest::LeaveRoom));
            }
            return;
        }

        match event {
            ServerEvent::RoomCreated(code) => {
                self.pending_request = None;
                if self.room.is_some() || self.phase != Phase::WaitingForRoom {
                    effects.push(Effect::Send(ClientRequest::LeaveRoom));
                    return;
                }
                self.enter_room(code.clone(), RoomRole::Host, effects);
                effects.push(Effect::Status(StatusMessage::WaitingForOpponent(code)));
            }
            ServerEvent::JoinAccepted(code) => {
                let code = match self.pending_request.take() {
                    Some(PendingRoomRequest::Join(pending)) if code.is_empty() => pending,
                    _ => code,
                };
                if self.room.is_some() || self.phase != Phase::WaitingForRoom {
                    effects.push(Effect::Send(ClientRequest::LeaveRoom));
                    return;
                }
                self.enter_room(code.clone(), RoomRole::Guest, effects);
                effects.push(Effect::Status(StatusMessage::JoiningRoom(code)));
            }
            ServerEvent::JoinRejected(error) => {
                self.pending_request = None;
                effects.push(Effect::Status(StatusMessage::JoinFailed(error)));
            }
            ServerEvent::GameStarted => {
                if self.room.is_none() {
                    log!("Ignoring game start outside of a room");
                    return;
                }
                self.start_online_game(effects);
            }
            ServerEvent::OpponentMoved(index) => self.opponent_moved(index, effects),
            ServerEvent::RematchRequested => match self.phase {
                Phase::Ended | Phase::InProgress if self.room.is_some() => {
                    self.start_online_game(effects);
                }
                _ => {}
            },
            ServerEvent::OpponentLeft => {
                if self.room.is_none() {
                    return;
                }
                self.leave_room(effects);
                self.phase = Phase::WaitingForRoom;
                effects.push(Effect::Status(StatusMessage::OpponentLeft));
            }
            ServerEvent::Error {
                code: ErrorCode::VersionMismatch,
                message,
            } => self.connection_failed(message, effects),
            ServerEvent::Error { code, message } => {
                // The server dropped the offending frame, so any room request
                // in flight will never be answered.
                log!("Server error {:?}: {}", code, message);
                self.pending_request = None;
            }
        }
    }

    fn opponent_moved(&mut self, index: usize, effects: &mut Vec<Effect>) {
        if self.phase != Phase::InProgress {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.game.current_mark() == self.local_mark {
            log!("Dropping out-of-turn opponent move at {}", index);
            return;
        }

        let Some(status) = self.place(index, effects) else {
            return;
        };
        if status.is_terminal() {
            self.end_game(status, effects);
        } else {
            self.set_locked(false);
            effects.push(Effect::Status(StatusMessage::OnlineYourTurn {
                mark: self.local_mark,
            }));
        }
    }

    fn connection_failed(&mut self, reason: String, effects: &mut Vec<Effect>) {
        log!("Online mode unavailable: {}", reason);
        // The first reason stays on screen, e.g. a version mismatch followed
        // by the server closing the socket.
        if self.mode != Some(Mode::Online) || self.phase == Phase::Unavailable {
            return;
        }
        self.discard_session(effects);
        if self.room.take().is_some() {
            effects.push(Effect::Room(None));
        }
        self.pending_request = None;
        self.phase = Phase::Unavailable;
        effects.push(Effect::Status(StatusMessage::OnlineUnavailable(reason)));
    }

    fn timer_fired(&mut self, token: TimerToken, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            log!("Ignoring stale {}", token);
            return;
        };

        if session.ai_timer == Some(token) {
            session.ai_timer = None;
            self.play_ai_move(effects);
        } else if session.restart_timer == Some(token) {
            session.restart_timer = None;
            self.auto_restart(effects);
        } else {
            log!("Ignoring stale {}", token);
        }
    }

    fn play_ai_move(&mut self, effects: &mut Vec<Effect>) {
        if self.mode != Some(Mode::Cpu) || self.phase != Phase::InProgress {
            return;
        }
        let human_mark = self.local_mark;
        let Some(ai_mark) = human_mark.opponent() else {
            return;
        };
        let Some(board) = self.session.as_ref().map(|session| *session.game.board()) else {
            return;
        };

        let Some(index) = best_move(&board, ai_mark, human_mark) else {
            self.set_locked(false);
            return;
        };
        let Some(status) = self.place(index, effects) else {
            self.set_locked(false);
            return;
        };

        if status.is_terminal() {
            self.end_game(status, effects);
        } else {
            self.set_locked(false);
            effects.push(Effect::Status(StatusMessage::YourTurn));
        }
    }

    fn auto_restart(&mut self, effects: &mut Vec<Effect>) {
        match self.mode {
            Some(Mode::Cpu) => self.start_cpu_game(effects),
            Some(Mode::Local) => self.start_local_game(effects),
            Some(Mode::Online) => {
                if self.room.is_some() {
                    effects.push(Effect::Send(ClientRequest::RequestRematch));
                    self.start_online_game(effects);
                }
            }
            None => {}
        }
    }

    fn show_mark_picker(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::PickingMark;
        effects.push(Effect::Render(BoardView::of(&TicTacToeGame::new())));
        effects.push(Effect::ShowMarkPicker);
        effects.push(Effect::Status(StatusMessage::ChooseMark));
    }

    fn start_cpu_game(&mut self, effects: &mut Vec<Effect>) {
        self.discard_session(effects);
        self.begin_session(false, effects);

        if self.local_mark == Mark::O {
            self.schedule_ai_move(self.timings.ai_first_move_delay, effects);
        } else {
            effects.push(Effect::Status(StatusMessage::YourTurn));
        }
    }

    fn start_local_game(&mut self, effects: &mut Vec<Effect>) {
        self.discard_session(effects);
        self.begin_session(false, effects);
        effects.push(Effect::Status(StatusMessage::LocalTurn { mark: Mark::X }));
    }

    fn start_online_game(&mut self, effects: &mut Vec<Effect>) {
        let Some(role) = self.room.as_ref().map(|room| room.role) else {
            return;
        };
        self.local_mark = role.mark();

        self.discard_session(effects);
        let is_host = role == RoomRole::Host;
        self.begin_session(!is_host, effects);

        effects.push(Effect::Status(if is_host {
            StatusMessage::OnlineYourTurn { mark: Mark::X }
        } else {
            StatusMessage::OnlineOpponentTurn { mark: Mark::X }
        }));
    }

    fn begin_session(&mut self, locked: bool, effects: &mut Vec<Effect>) {
        let session = Session::new(locked);
        effects.push(Effect::Render(BoardView::of(&session.game)));
        self.session = Some(session);
        self.phase = Phase::InProgress;
    }

    fn end_game(&mut self, status: GameStatus, effects: &mut Vec<Effect>) {
        self.phase = Phase::Ended;
        self.set_locked(true);

        let message = match status.winner() {
            Some(winner) => {
                let participant = if self.is_participant_one(winner) {
                    Participant::One
                } else {
                    Participant::Two
                };
                self.scores.record_win(participant);
                self.result_message(winner)
            }
            None => {
                self.scores.record_draw();
                StatusMessage::Draw
            }
        };
        log!("Game over: {}", message);

        effects.push(Effect::Scores(self.scores));
        effects.push(Effect::Status(message));

        let token = self.allocate_timer();
        if let Some(session) = self.session.as_mut() {
            session.restart_timer = Some(token);
            effects.push(Effect::ScheduleTimer {
                token,
                kind: TimerKind::AutoRestart,
                delay: self.timings.auto_restart_delay,
            });
        }
    }

    fn is_participant_one(&self, winner: Mark) -> bool {
        match self.mode {
            Some(Mode::Local) => winner == Mark::X,
            _ => winner == self.local_mark,
        }
    }

    fn result_message(&self, winner: Mark) -> StatusMessage {
        match self.mode {
            Some(Mode::Cpu) if winner == self.local_mark => StatusMessage::YouWin,
            Some(Mode::Cpu) => StatusMessage::CpuWins,
            Some(Mode::Local) => StatusMessage::PlayerWins { mark: winner },
            _ if winner == self.local_mark => StatusMessage::YouWin,
            _ => StatusMessage::YouLose,
        }
    }

    fn schedule_ai_move(&mut self, delay: Duration, effects: &mut Vec<Effect>) {
        let token = self.allocate_timer();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.locked = true;
        session.ai_timer = Some(token);
        effects.push(Effect::ScheduleTimer {
            token,
            kind: TimerKind::AiMove,
            delay,
        });
        effects.push(Effect::Status(StatusMessage::CpuThinking));
    }

    fn place(&mut self, index: usize, effects: &mut Vec<Effect>) -> Option<GameStatus> {
        let session = self.session.as_mut()?;
        match session.game.place_mark(index) {
            Ok(status) => {
                effects.push(Effect::Render(BoardView::of(&session.game)));
                Some(status)
            }
            Err(e) => {
                log!("Move at {} rejected: {}", index, e);
                None
            }
        }
    }

    fn enter_room(&mut self, code: RoomCode, role: RoomRole, effects: &mut Vec<Effect>) {
        let room = OnlineRoom { code, role };
        log!("Entered room {} as {:?}", room.code, room.role);
        effects.push(Effect::Room(Some(room.clone())));
        self.room = Some(room);
    }

    /// Drops the room and its session, telling the server when there was a
    /// room to leave.
    fn leave_room(&mut self, effects: &mut Vec<Effect>) {
        self.discard_session(effects);
        if let Some(room) = self.room.take() {
            log!("Leaving room {}", room.code);
            effects.push(Effect::Send(ClientRequest::LeaveRoom));
            effects.push(Effect::Room(None));
        }
    }

    fn discard_session(&mut self, effects: &mut Vec<Effect>) {
        if let Some(session) = self.session.take() {
            effects.extend(session.pending_timers().map(Effect::CancelTimer));
        }
    }

    fn set_locked(&mut self, locked: bool) {
        if let Some(session) = self.session.as_mut() {
            session.locked = locked;
        }
    }

    fn allocate_timer(&mut self) -> TimerToken {
        let token = TimerToken::new(self.next_timer);
        self.next_timer += 1;
        token
    }
}
