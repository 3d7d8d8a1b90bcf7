use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio::sync::mpsc;

use common::proto::{ClientMessage, ErrorCode, ServerMessage, client_message};
use common::protocol::error_message;
use common::{ConnectionId, log};

use crate::room_service::RoomService;
use crate::web_server::WebServerState;

const OUTBOUND_QUEUE_SIZE: usize = 64;
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// What the receive loop should do after a decoded frame.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

pub async fn handle_websocket(socket: WebSocket, state: WebServerState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_SIZE);

    let connection = ConnectionId::next();
    state.broadcaster.register(connection, tx.clone()).await;
    log!("WebSocket client connected: {}", connection);

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let buf = message.encode_to_vec();
            if ws_sender.send(Message::Binary(buf.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        let data = match result {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log!("WebSocket error from {}: {}", connection, e);
                break;
            }
        };

        let client_message = match ClientMessage::decode(data.as_ref()) {
            Ok(message) => message,
            Err(e) => {
                log!("Failed to decode message from {}: {}", connection, e);
                let reply = error_message(ErrorCode::MalformedMessage, "Malformed message".to_string());
                if let Err(e) = tx.send(reply).await {
                    log!("Failed to send error to {}: {}", connection, e);
                    break;
                }
                continue;
            }
        };

        if handle_client_message(&state.room_service, &tx, connection, client_message).await
            == Flow::Close
        {
            break;
        }
    }

    log!("WebSocket client disconnected: {}", connection);
    state.room_service.leave(connection).await;
    state.broadcaster.unregister(connection).await;
    drop(tx);

    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}

async fn handle_client_message(
    room_service: &RoomService,
    tx: &mpsc::Sender<ServerMessage>,
    connection: ConnectionId,
    client_message: ClientMessage,
) -> Flow {
    let server_version = common::version::get_version();
    if client_message.version != server_version {
        log!(
            "Rejecting {}: client version '{}', server version '{}'",
            connection,
            client_message.version,
            server_version
        );
        let reply = error_message(
            ErrorCode::VersionMismatch,
            format!(
                "Version mismatch: client version '{}', server version '{}'",
                client_message.version, server_version
            ),
        );
        if let Err(e) = tx.send(reply).await {
            log!("Failed to send error to {}: {}", connection, e);
        }
        return Flow::Close;
    }

    let Some(message) = client_message.message else {
        return Flow::Continue;
    };

    match message {
        client_message::Message::CreateRoom(_) => {
            room_service.create_room(connection).await;
        }
        client_message::Message::JoinRoom(request) => {
            room_service.join_room(connection, &request.code).await;
        }
        client_message::Message::MakeMove(payload) => {
            room_service.relay_move(connection, payload).await;
        }
        client_message::Message::RequestRematch(_) => {
            room_service.relay_rematch(connection).await;
        }
        client_message::Message::LeaveRoom(_) => {
            room_service.leave(connection).await;
        }
    }

    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::Broadcaster;
    use crate::room_registry::RoomRegistry;
    use common::protocol::{ClientRequest, ServerEvent};

    async fn connected(broadcaster: &Broadcaster, id: u64) -> (ConnectionId, mpsc::Sender<ServerMessage>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let connection = ConnectionId::new(id);
        broadcaster.register(connection, tx.clone()).await;
        (connection, tx, rx)
    }

    #[tokio::test]
    async fn test_version_mismatch_closes_connection() {
        let broadcaster = Broadcaster::new();
        let service = RoomService::new(RoomRegistry::with_seed(1), broadcaster.clone());
        let (connection, tx, mut rx) = connected(&broadcaster, 1).await;

        let mut message = ClientRequest::CreateRoom.to_proto();
        message.version = "0.0.0-old".to_string();
        let flow = handle_client_message(&service, &tx, connection, message).await;

        assert_eq!(flow, Flow::Close);
        let event = rx.try_recv().ok().and_then(ServerEvent::from_proto);
        assert!(matches!(
            event,
            Some(ServerEvent::Error { code: ErrorCode::VersionMismatch, .. })
        ));
        assert_eq!(service.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_version_mismatch_closes_when_outbound_queue_is_gone() {
        let broadcaster = Broadcaster::new();
        let service = RoomService::new(RoomRegistry::with_seed(1), broadcaster.clone());
        let (connection, tx, rx) = connected(&broadcaster, 1).await;
        drop(rx);

        let mut message = ClientRequest::CreateRoom.to_proto();
        message.version = "0.0.0-old".to_string();
        let flow = handle_client_message(&service, &tx, connection, message).await;

        assert_eq!(flow, Flow::Close);
    }

    #[tokio::test]
    async fn test_requests_are_dispatched_to_rooms() {
        let broadcaster = Broadcaster::new();
        let service = RoomService::new(RoomRegistry::with_seed(1), broadcaster.clone());
        let (host, host_tx, mut host_rx) = connected(&broadcaster, 1).await;
        let (guest, guest_tx, mut guest_rx) = connected(&broadcaster, 2).await;

        let flow =
            handle_client_message(&service, &host_tx, host, ClientRequest::CreateRoom.to_proto()).await;
        assert_eq!(flow, Flow::Continue);
        let Some(ServerEvent::RoomCreated(code)) =
            host_rx.try_recv().ok().and_then(ServerEvent::from_proto)
        else {
            panic!("expected room code");
        };

        handle_client_message(&service, &guest_tx, guest, ClientRequest::JoinRoom(code).to_proto()).await;
        handle_client_message(&service, &host_tx, host, ClientRequest::Move(4).to_proto()).await;

        let mut guest_events = Vec::new();
        while let Ok(message) = guest_rx.try_recv() {
            guest_events.extend(ServerEvent::from_proto(message));
        }
        assert_eq!(guest_events.last(), Some(&ServerEvent::OpponentMoved(4)));

        handle_client_message(&service, &guest_tx, guest, ClientRequest::LeaveRoom.to_proto()).await;
        let mut host_events = Vec::new();
        while let Ok(message) = host_rx.try_recv() {
            host_events.extend(ServerEvent::from_proto(message));
        }
        assert_eq!(host_events.last(), Some(&ServerEvent::OpponentLeft));
    }
}
