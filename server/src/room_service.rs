use std::sync::Arc;

use tokio::sync::Mutex;

use common::proto::MoveMessage;
use common::protocol::{
    game_start_message, join_accepted_message, join_rejected_message, opponent_left_message,
    relayed_move_message, rematch_requested_message, room_created_message,
};
use common::{ConnectionId, RoomCode, log};

use crate::broadcaster::Broadcaster;
use crate::room_registry::{LeaveOutcome, RoomRegistry};

/// Room operations for connected clients. Every handler updates the registry
/// under one lock acquisition and sends after releasing it.
#[derive(Clone, Debug)]
pub struct RoomService {
    registry: Arc<Mutex<RoomRegistry>>,
    broadcaster: Broadcaster,
}

impl RoomService {
    pub fn new(registry: RoomRegistry, broadcaster: Broadcaster) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            broadcaster,
        }
    }

    pub async fn create_room(&self, connection: ConnectionId) -> RoomCode {
        let outcome = self.registry.lock().await.create_room(connection);

        if let Some(previous) = &outcome.previous {
            self.notify_left(connection, previous).await;
        }
        log!("[room:{}] Created by {}", outcome.code, connection);
        self.broadcaster
            .send_to(connection, room_created_message(&outcome.code))
            .await;
        outcome.code
    }

    pub async fn join_room(&self, connection: ConnectionId, raw_code: &str) {
        let code = RoomCode::normalize(raw_code);
        let result = self.registry.lock().await.join_room(connection, &code);

        match result {
            Ok(outcome) => {
                if let Some(previous) = &outcome.previous {
                    self.notify_left(connection, previous).await;
                }
                log!("[room:{}] {} joined, host {}", outcome.code, outcome.guest, outcome.host);
                self.broadcaster
                    .send_to(outcome.guest, join_accepted_message(&outcome.code))
                    .await;
                self.broadcaster
                    .send_to_all(&[outcome.host, outcome.guest], game_start_message())
                    .await;
            }
            Err(error) => {
                log!("[room:{}] Join by {} rejected: {}", code, connection, error);
                self.broadcaster
                    .send_to(connection, join_rejected_message(error))
                    .await;
            }
        }
    }

    /// Forwards the payload to the sender's peer as-is. The server keeps no
    /// board, so nothing about the move is checked here.
    pub async fn relay_move(&self, connection: ConnectionId, payload: MoveMessage) {
        let peer = self.registry.lock().await.peer_of(connection);
        match peer {
            Some(peer) => {
                self.broadcaster
                    .send_to(peer, relayed_move_message(payload))
                    .await
            }
            None => log!("Dropping move from {}: no peer", connection),
        }
    }

    pub async fn relay_rematch(&self, connection: ConnectionId) {
        let peer = self.registry.lock().await.peer_of(connection);
        if let Some(peer) = peer {
            self.broadcaster
                .send_to(peer, rematch_requested_message())
                .await;
        }
    }

    pub async fn leave(&self, connection: ConnectionId) {
        let outcome = self.registry.lock().await.leave(connection);
        if let Some(outcome) = outcome {
            self.notify_left(connection, &outcome).await;
        }
    }

    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    async fn notify_left(&self, connection: ConnectionId, outcome: &LeaveOutcome) {
        log!("[room:{}] {} left", outcome.code, connection);
        if outcome.room_removed {
            log!("[room:{}] Removed", outcome.code);
        }
        if let Some(remaining) = outcome.remaining {
            self.broadcaster
                .send_to(remaining, opponent_left_message())
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::proto::ServerMessage;
    use common::protocol::{JoinError, ServerEvent};
    use tokio::sync::mpsc;

    struct TestClient {
        id: ConnectionId,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl TestClient {
        fn events(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(message) = self.rx.try_recv() {
                events.extend(ServerEvent::from_proto(message));
            }
            events
        }
    }

    async fn setup(count: u64) -> (RoomService, Vec<TestClient>) {
        let broadcaster = Broadcaster::new();
        let mut clients = Vec::new();
        for id in 1..=count {
            let (tx, rx) = mpsc::channel(16);
            let id = ConnectionId::new(id);
            broadcaster.register(id, tx).await;
            clients.push(TestClient { id, rx });
        }
        (RoomService::new(RoomRegistry::with_seed(3), broadcaster), clients)
    }

    #[tokio::test]
    async fn test_join_acks_then_starts_both() {
        let (service, mut clients) = setup(2).await;
        let code = service.create_room(clients[0].id).await;
        assert_eq!(clients[0].events(), vec![ServerEvent::RoomCreated(code.clone())]);

        service.join_room(clients[1].id, &code.as_str().to_lowercase()).await;
        assert_eq!(
            clients[1].events(),
            vec![ServerEvent::JoinAccepted(code.clone()), ServerEvent::GameStarted]
        );
        assert_eq!(clients[0].events(), vec![ServerEvent::GameStarted]);
    }

    #[tokio::test]
    async fn test_join_errors_reach_only_the_joiner() {
        let (service, mut clients) = setup(3).await;
        service.join_room(clients[0].id, "QQQQQ").await;
        assert_eq!(
            clients[0].events(),
            vec![ServerEvent::JoinRejected(JoinError::RoomNotFound)]
        );

        let code = service.create_room(clients[0].id).await;
        service.join_room(clients[1].id, code.as_str()).await;
        clients[0].events();
        clients[1].events();

        service.join_room(clients[2].id, code.as_str()).await;
        assert_eq!(clients[2].events(), vec![ServerEvent::JoinRejected(JoinError::RoomFull)]);
        assert!(clients[0].events().is_empty());
        assert!(clients[1].events().is_empty());
    }

    #[tokio::test]
    async fn test_moves_and_rematches_go_to_peer_only() {
        let (service, mut clients) = setup(2).await;
        let code = service.create_room(clients[0].id).await;
        service.join_room(clients[1].id, code.as_str()).await;
        clients[0].events();
        clients[1].events();

        service.relay_move(clients[0].id, MoveMessage { index: 4 }).await;
        assert_eq!(clients[1].events(), vec![ServerEvent::OpponentMoved(4)]);
        assert!(clients[0].events().is_empty());

        // Relayed verbatim, even when out of range.
        service.relay_move(clients[1].id, MoveMessage { index: 42 }).await;
        assert_eq!(clients[0].events(), vec![ServerEvent::OpponentMoved(42)]);

        service.relay_rematch(clients[1].id).await;
        assert_eq!(clients[0].events(), vec![ServerEvent::RematchRequested]);
        assert!(clients[1].events().is_empty());
    }

    #[tokio::test]
    async fn test_leave_notifies_peer_and_cleans_up() {
        let (service, mut clients) = setup(2).await;
        let code = service.create_room(clients[0].id).await;
        service.join_room(clients[1].id, code.as_str()).await;
        clients[0].events();
        clients[1].events();

        service.leave(clients[1].id).await;
        assert_eq!(clients[0].events(), vec![ServerEvent::OpponentLeft]);
        assert_eq!(service.room_count().await, 1);

        service.leave(clients[0].id).await;
        assert_eq!(service.room_count().await, 0);
        assert!(clients[1].events().is_empty());
    }

    #[tokio::test]
    async fn test_move_without_room_is_dropped() {
        let (service, mut clients) = setup(1).await;
        service.relay_move(clients[0].id, MoveMessage { index: 0 }).await;
        service.relay_rematch(clients[0].id).await;
        assert!(clients[0].events().is_empty());
    }
}
