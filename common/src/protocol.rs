//! Typed view of the wire messages in `proto/duel.proto`.
//!
//! Clients build requests as [`ClientRequest`] and read replies as
//! [`ServerEvent`]; the server works on the raw prost types so that move
//! payloads are relayed without being reinterpreted.

use std::fmt;

use crate::identifiers::RoomCode;
use crate::proto::{
    self, ClientMessage, ErrorCode, JoinRoomResponse, MoveMessage, ServerMessage, client_message,
    server_message,
};
use crate::version::VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    RoomNotFound,
    RoomFull,
    AlreadyInRoom,
}

impl JoinError {
    pub fn to_proto(&self) -> proto::JoinRoomError {
        match self {
            JoinError::RoomNotFound => proto::JoinRoomError::RoomNotFound,
            JoinError::RoomFull => proto::JoinRoomError::RoomFull,
            JoinError::AlreadyInRoom => proto::JoinRoomError::AlreadyInRoom,
        }
    }

    pub fn from_proto(error: proto::JoinRoomError) -> Option<Self> {
        match error {
            proto::JoinRoomError::RoomNotFound => Some(JoinError::RoomNotFound),
            proto::JoinRoomError::RoomFull => Some(JoinError::RoomFull),
            proto::JoinRoomError::AlreadyInRoom => Some(JoinError::AlreadyInRoom),
            proto::JoinRoomError::Unspecified => None,
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::RoomNotFound => write!(f, "Room not found"),
            JoinError::RoomFull => write!(f, "Room is full"),
            JoinError::AlreadyInRoom => write!(f, "Already in this room"),
        }
    }
}

impl std::error::Error for JoinError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    CreateRoom,
    JoinRoom(RoomCode),
    Move(usize),
    RequestRematch,
    LeaveRoom,
}

impl ClientRequest {
    pub fn to_proto(&self) -> ClientMessage {
        let message = match self {
            ClientRequest::CreateRoom => {
                client_message::Message::CreateRoom(proto::CreateRoomRequest {})
            }
            ClientRequest::JoinRoom(code) => {
                client_message::Message::JoinRoom(proto::JoinRoomRequest {
                    code: code.to_string(),
                })
            }
            ClientRequest::Move(index) => client_message::Message::MakeMove(MoveMessage {
                index: *index as u32,
            }),
            ClientRequest::RequestRematch => {
                client_message::Message::RequestRematch(proto::RematchRequest {})
            }
            ClientRequest::LeaveRoom => {
                client_message::Message::LeaveRoom(proto::LeaveRoomRequest {})
            }
        };

        ClientMessage {
            version: VERSION.to_string(),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    RoomCreated(RoomCode),
    JoinAccepted(RoomCode),
    JoinRejected(JoinError),
    GameStarted,
    OpponentMoved(usize),
    RematchRequested,
    OpponentLeft,
    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    /// `None` for an empty envelope or a join response carrying no usable
    /// outcome.
    pub fn from_proto(message: ServerMessage) -> Option<Self> {
        let event = match message.message? {
            server_message::Message::RoomCreated(response) => {
                ServerEvent::RoomCreated(RoomCode::new(response.code))
            }
            server_message::Message::JoinRoom(response) => {
                if response.ok {
                    ServerEvent::JoinAccepted(RoomCode::new(response.code))
                } else {
                    let error = proto::JoinRoomError::try_from(response.error).ok()?;
                    ServerEvent::JoinRejected(JoinError::from_proto(error)?)
                }
            }
            server_message::Message::GameStart(_) => ServerEvent::GameStarted,
            server_message::Message::OpponentMove(payload) => {
                ServerEvent::OpponentMoved(payload.index as usize)
            }
            server_message::Message::RematchRequested(_) => ServerEvent::RematchRequested,
            server_message::Message::OpponentLeft(_) => ServerEvent::OpponentLeft,
            server_message::Message::Error(error) => ServerEvent::Error {
                code: ErrorCode::try_from(error.code).unwrap_or(ErrorCode::Unspecified),
                message: error.message,
            },
        };
        Some(event)
    }
}

pub fn room_created_message(code: &RoomCode) -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::RoomCreated(proto::RoomCreatedResponse {
            code: code.to_string(),
        })),
    }
}

pub fn join_accepted_message(code: &RoomCode) -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::JoinRoom(JoinRoomResponse {
            ok: true,
            error: proto::JoinRoomError::Unspecified.into(),
            code: code.to_string(),
        })),
    }
}

pub fn join_rejected_message(error: JoinError) -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::JoinRoom(JoinRoomResponse {
            ok: false,
            error: error.to_proto().into(),
            code: String::new(),
        })),
    }
}

pub fn game_start_message() -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::GameStart(proto::GameStartNotification {})),
    }
}

/// Wraps a client's move payload for its peer without touching it.
pub fn relayed_move_message(payload: MoveMessage) -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::OpponentMove(payload)),
    }
}

pub fn rematch_requested_message() -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::RematchRequested(proto::RematchRequest {})),
    }
}

pub fn opponent_left_message() -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::OpponentLeft(proto::OpponentLeftNotification {})),
    }
}

pub fn error_message(code: ErrorCode, message: String) -> ServerMessage {
    ServerMessage {
        message: Some(server_message::Message::Error(proto::ErrorResponse {
            code: code.into(),
            message,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_client_request_carries_version() {
        let message = ClientRequest::Move(7).to_proto();
        assert_eq!(message.version, VERSION);
        assert_eq!(
            message.message,
            Some(client_message::Message::MakeMove(MoveMessage { index: 7 }))
        );
    }

    #[test]
    fn test_join_rejection_survives_the_wire() {
        let bytes = join_rejected_message(JoinError::RoomFull).encode_to_vec();
        let decoded = ServerMessage::decode(bytes.as_slice()).unwrap();
        assert_eq!(
            ServerEvent::from_proto(decoded),
            Some(ServerEvent::JoinRejected(JoinError::RoomFull))
        );
    }

    #[test]
    fn test_join_accepted_keeps_code() {
        let code = RoomCode::new("AB3KZ".to_string());
        assert_eq!(
            ServerEvent::from_proto(join_accepted_message(&code)),
            Some(ServerEvent::JoinAccepted(code))
        );
    }

    #[test]
    fn test_unspecified_join_error_is_dropped() {
        let message = ServerMessage {
            message: Some(server_message::Message::JoinRoom(JoinRoomResponse {
                ok: false,
                error: proto::JoinRoomError::Unspecified.into(),
                code: String::new(),
            })),
        };
        assert_eq!(ServerEvent::from_proto(message), None);
        assert_eq!(ServerEvent::from_proto(ServerMessage { message: None }), None);
    }

    #[test]
    fn test_relayed_move_is_verbatim() {
        let payload = MoveMessage { index: 42 };
        assert_eq!(
            ServerEvent::from_proto(relayed_move_message(payload)),
            Some(ServerEvent::OpponentMoved(42))
        );
    }
}
