use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use common::connection::{ConnectionEvent, ServerConnection, spawn_connection};
use common::engine::tictactoe::{Mark, POSITION_NAMES};
use common::log;
use common::protocol::ClientRequest;
use common::session::{
    BoardView, Effect, Mode, OnlineRoom, RoomRole, ScoreTally, SessionCoordinator, SessionEvent,
    TimerScheduler,
};

const HELP: &str = "\
Commands:
  1-9            place a mark (top-left is 1, bottom-right is 9)
  x | o          pick your mark against the CPU
  mode cpu|local|online
  new            start a new game
  reset          reset the score
  create         create an online room
  join CODE      join an online room
  leave          leave the online room
  help           show this help
  quit           exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(SessionEvent),
    Help,
    Quit,
}

pub fn parse_mode(input: &str) -> Option<Mode> {
    match input.trim().to_ascii_lowercase().as_str() {
        "cpu" => Some(Mode::Cpu),
        "local" => Some(Mode::Local),
        "online" => Some(Mode::Online),
        _ => None,
    }
}

pub fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_ascii_lowercase();
    let rest = parts.collect::<Vec<_>>().join(" ");

    if let Ok(cell) = head.parse::<usize>() {
        return (1..=9)
            .contains(&cell)
            .then(|| Command::Event(SessionEvent::CellClicked(cell - 1)));
    }

    let event = match head.as_str() {
        "x" => SessionEvent::PickMark(Mark::X),
        "o" => SessionEvent::PickMark(Mark::O),
        "mode" => SessionEvent::SelectMode(parse_mode(&rest)?),
        "new" => SessionEvent::NewGame,
        "reset" => SessionEvent::ResetScores,
        "create" => SessionEvent::CreateRoom,
        "join" if !rest.is_empty() => SessionEvent::JoinRoom(rest),
        "leave" => SessionEvent::LeaveRoom,
        "help" | "?" => return Some(Command::Help),
        "quit" | "q" | "exit" => return Some(Command::Quit),
        _ => return None,
    };
    Some(Command::Event(event))
}

/// Three text rows plus a line naming the winning cells, if any.
pub fn render_board(view: &BoardView) -> String {
    let cells = view.board.cells();
    let winning = view.winning_line();

    let mut rows = Vec::with_capacity(3);
    for row in 0..3 {
        let row_text: Vec<String> = (0..3)
            .map(|col| {
                let index = row * 3 + col;
                let symbol = match cells[index] {
                    Mark::Empty => char::from_digit(index as u32 + 1, 10).unwrap_or(' '),
                    mark => mark.symbol(),
                };
                if winning.is_some_and(|line| line.contains(index)) {
                    format!("[{}]", symbol)
                } else {
                    format!(" {} ", symbol)
                }
            })
            .collect();
        rows.push(row_text.join("|"));
    }

    let mut text = rows.join("\n---+---+---\n");
    if let Some(line) = winning {
        let names: Vec<&str> = line.cells().iter().map(|i| POSITION_NAMES[*i]).collect();
        text.push_str(&format!("\nWinning line: {}", names.join(", ")));
    }
    text
}

pub fn render_scores(mode: Option<Mode>, scores: &ScoreTally) -> String {
    let (one, two) = match mode {
        Some(Mode::Cpu) => ("You", "CPU"),
        Some(Mode::Local) => ("Player 1", "Player 2"),
        _ => ("You", "Opponent"),
    };
    format!(
        "{}: {}  {}: {}  Draws: {}",
        one, scores.participant_one_wins, two, scores.participant_two_wins, scores.draws
    )
}

pub fn render_room(room: Option<&OnlineRoom>) -> String {
    match room {
        Some(room) => {
            let role = match room.role {
                RoomRole::Host => "host, X",
                RoomRole::Guest => "guest, O",
            };
            format!("Room {} ({})", room.code, role)
        }
        None => "No room".to_string(),
    }
}

/// Server connection opened on the first `Effect::Connect` and reopened
/// after it drops.
struct ServerLink {
    url: String,
    connection: Option<ServerConnection>,
    events: Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
}

impl ServerLink {
    fn new(url: String) -> Self {
        Self {
            url,
            connection: None,
            events: None,
        }
    }

    fn connect(&mut self) {
        if self
            .connection
            .as_ref()
            .is_some_and(|connection| !connection.is_closed())
        {
            return;
        }
        let (connection, events) = spawn_connection(self.url.clone());
        self.connection = Some(connection);
        self.events = Some(events);
    }

    fn send(&self, request: ClientRequest) {
        let Some(connection) = &self.connection else {
            log!("No server connection, dropping {:?}", request);
            return;
        };
        if !connection.send(request) {
            log!("Server connection closed, request dropped");
        }
    }

    /// Pending forever while disconnected so the select loop ignores it.
    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    fn reset(&mut self) {
        self.connection = None;
        self.events = None;
    }
}

pub async fn run(
    mut coordinator: SessionCoordinator,
    initial_mode: Mode,
    server_url: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut scheduler, mut fired_rx) = TimerScheduler::new();
    let mut link = ServerLink::new(server_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = VecDeque::from([SessionEvent::SelectMode(initial_mode)]);

    println!("{}", HELP);

    loop {
        while let Some(event) = pending.pop_front() {
            for effect in coordinator.handle(event) {
                if scheduler.apply(&effect) {
                    continue;
                }
                match effect {
                    Effect::Render(view) => println!("\n{}\n", render_board(&view)),
                    Effect::Status(status) => println!("{}", status),
                    Effect::Scores(scores) => {
                        println!("{}", render_scores(coordinator.mode(), &scores))
                    }
                    Effect::Room(room) => println!("{}", render_room(room.as_ref())),
                    Effect::ShowMarkPicker => println!("Play as x or o?"),
                    Effect::Connect => link.connect(),
                    Effect::Send(request) => link.send(request),
                    Effect::ScheduleTimer { .. } | Effect::CancelTimer(_) => {}
                }
            }
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(Command::Event(event)) => pending.push_back(event),
                    Some(Command::Help) => println!("{}", HELP),
                    Some(Command::Quit) => break,
                    None => println!("Unknown command, type 'help'"),
                }
            }
            Some(token) = fired_rx.recv() => {
                scheduler.fired(token);
                pending.push_back(SessionEvent::TimerFired(token));
            }
            event = link.next_event() => match event {
                Some(ConnectionEvent::Server(event)) => pending.push_back(SessionEvent::Server(event)),
                Some(ConnectionEvent::Closed(reason)) => {
                    link.reset();
                    pending.push_back(SessionEvent::ConnectionFailed(reason));
                }
                None => link.reset(),
            },
        }
    }

    scheduler.cancel_all();
    Ok(())
}
