use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use common::id_generator::generate_room_code;
use common::protocol::JoinError;
use common::{ConnectionId, RoomCode};

pub const ROOM_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Host,
    Guest,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub occupants: Vec<(ConnectionId, Seat)>,
}

impl Room {
    fn new(code: RoomCode, host: ConnectionId) -> Self {
        Self {
            code,
            occupants: vec![(host, Seat::Host)],
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= ROOM_CAPACITY
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.occupants.iter().any(|(id, _)| *id == connection)
    }

    pub fn peer_of(&self, connection: ConnectionId) -> Option<ConnectionId> {
        self.occupants
            .iter()
            .map(|(id, _)| *id)
            .find(|id| *id != connection)
    }

    fn remove(&mut self, connection: ConnectionId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|(id, _)| *id != connection);
        self.occupants.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub code: RoomCode,
    /// Occupant still in the room, to be told the opponent left.
    pub remaining: Option<ConnectionId>,
    pub room_removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub code: RoomCode,
    pub previous: Option<LeaveOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub code: RoomCode,
    pub host: ConnectionId,
    pub guest: ConnectionId,
    pub previous: Option<LeaveOutcome>,
}

/// Room code -> occupants, plus the reverse index so a connection is in at
/// most one room.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    memberships: HashMap<ConnectionId, RoomCode>,
    rng: StdRng,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            rng,
        }
    }

    pub fn create_room(&mut self, host: ConnectionId) -> CreateOutcome {
        self.create_with(host, generate_room_code)
    }

    /// Like [`create_room`](Self::create_room) but drawing codes from
    /// `generator` until one is free.
    pub fn create_room_with_generator<F>(&mut self, host: ConnectionId, mut generator: F) -> CreateOutcome
    where
        F: FnMut() -> String,
    {
        self.create_with(host, |_| generator())
    }

    fn create_with<F>(&mut self, host: ConnectionId, mut generator: F) -> CreateOutcome
    where
        F: FnMut(&mut StdRng) -> String,
    {
        let previous = self.leave(host);

        let code = loop {
            let candidate = RoomCode::new(generator(&mut self.rng));
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        self.insert_room(code.clone(), host);
        CreateOutcome { code, previous }
    }

    pub fn join_room(&mut self, connection: ConnectionId, code: &RoomCode) -> Result<JoinOutcome, JoinError> {
        let room = self.rooms.get(code).ok_or(JoinError::RoomNotFound)?;
        if room.contains(connection) {
            return Err(JoinError::AlreadyInRoom);
        }
        if room.is_full() {
            return Err(JoinError::RoomFull);
        }

        let previous = self.leave(connection);

        // Leaving the previous room never touches this one: it was not full,
        // so it cannot be the room `connection` was in.
        let room = self.rooms.get_mut(code).ok_or(JoinError::RoomNotFound)?;
        let host = room
            .occupants
            .iter()
            .find(|(_, seat)| *seat == Seat::Host)
            .or_else(|| room.occupants.first())
            .map(|(id, _)| *id)
            .ok_or(JoinError::RoomNotFound)?;
        room.occupants.push((connection, Seat::Guest));
        self.memberships.insert(connection, code.clone());

        Ok(JoinOutcome {
            code: code.clone(),
            host,
            guest: connection,
            previous,
        })
    }

    /// Removes `connection` from its room, deleting the room once empty.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<LeaveOutcome> {
        let code = self.memberships.remove(&connection)?;
        let room = self.rooms.get_mut(&code)?;
        room.remove(connection);

        let remaining = room.occupants.first().map(|(id, _)| *id);
        let room_removed = room.occupants.is_empty();
        if room_removed {
            self.rooms.remove(&code);
        }

        Some(LeaveOutcome {
            code,
            remaining,
            room_removed,
        })
    }

    pub fn peer_of(&self, connection: ConnectionId) -> Option<ConnectionId> {
        self.room_of(connection)?.peer_of(connection)
    }

    pub fn room_of(&self, connection: ConnectionId) -> Option<&Room> {
        let code = self.memberships.get(&connection)?;
        self.rooms.get(code)
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Removes a room outright, dropping every membership that points at it.
    pub fn delete_room(&mut self, code: &RoomCode) -> Option<Room> {
        let room = self.rooms.remove(code)?;
        for (id, _) in &room.occupants {
            self.memberships.remove(id);
        }
        Some(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn insert_room(&mut self, code: RoomCode, host: ConnectionId) {
        self.rooms.insert(code.clone(), Room::new(code.clone(), host));
        self.memberships.insert(host, code);
    }
}
