use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use common::proto::ServerMessage;
use common::{ConnectionId, log};

pub type ClientSender = mpsc::Sender<ServerMessage>;

/// Outbound channel per live connection. Each WebSocket owns a send task
/// draining its receiver.
#[derive(Clone)]
pub struct Broadcaster {
    clients: Arc<Mutex<HashMap<ConnectionId, ClientSender>>>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn register(&self, connection: ConnectionId, sender: ClientSender) {
        self.clients.lock().await.insert(connection, sender);
    }

    pub async fn unregister(&self, connection: ConnectionId) {
        self.clients.lock().await.remove(&connection);
    }

    pub async fn send_to(&self, connection: ConnectionId, message: ServerMessage) {
        let sender = self.clients.lock().await.get(&connection).cloned();
        if let Some(sender) = sender
            && let Err(e) = sender.send(message).await
        {
            log!("Failed to send to {}: {}", connection, e);
        }
    }

    pub async fn send_to_all(&self, connections: &[ConnectionId], message: ServerMessage) {
        for connection in connections {
            self.send_to(*connection, message.clone()).await;
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::game_start_message;

    #[tokio::test]
    async fn test_send_reaches_registered_connection_only() {
        let broadcaster = Broadcaster::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        broadcaster.register(ConnectionId::new(1), tx_a).await;
        broadcaster.register(ConnectionId::new(2), tx_b).await;

        broadcaster.send_to(ConnectionId::new(1), game_start_message()).await;
        assert_eq!(rx_a.try_recv().ok(), Some(game_start_message()));
        assert!(rx_b.try_recv().is_err());

        broadcaster.unregister(ConnectionId::new(1)).await;
        broadcaster.send_to(ConnectionId::new(1), game_start_message()).await;
        assert!(rx_a.try_recv().is_err());
        assert_eq!(broadcaster.connection_count().await, 1);
    }
}
