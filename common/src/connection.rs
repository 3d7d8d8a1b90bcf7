use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::log;
use crate::proto::ServerMessage;
use crate::protocol::{ClientRequest, ServerEvent};

type ServerStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Server(ServerEvent),
    /// The connection could not be opened or was lost. Always the last event.
    Closed(String),
}

/// Outbound half of a server connection. Dropping it closes the socket.
#[derive(Debug, Clone)]
pub struct ServerConnection {
    requests: mpsc::UnboundedSender<ClientRequest>,
}

impl ServerConnection {
    /// Queues `request`; requests sent before the socket opens go out once
    /// it does. Returns false when the connection task has already ended.
    pub fn send(&self, request: ClientRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

/// Connects to `url` in the background. Server events and the final
/// `Closed` event arrive on the returned receiver.
pub fn spawn_connection(
    url: String,
) -> (ServerConnection, mpsc::UnboundedReceiver<ConnectionEvent>) {
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    tokio::spawn(connection_task(url, requests_rx, events_tx));

    (
        ServerConnection {
            requests: requests_tx,
        },
        events_rx,
    )
}

async fn connection_task(
    url: String,
    requests: mpsc::UnboundedReceiver<ClientRequest>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    log!("Connecting to {}", url);
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            report(
                &events,
                ConnectionEvent::Closed(format!("Failed to connect to {}: {}", url, e)),
            );
            return;
        }
    };
    log!("Connected to {}", url);

    if let Some(reason) = pump(stream, requests, &events).await {
        log!("Connection to {} closed: {}", url, reason);
        report(&events, ConnectionEvent::Closed(reason));
    }
}

/// Runs until the socket fails or the caller drops its `ServerConnection`.
/// Returns the failure reason, or None for a caller-initiated close.
async fn pump(
    stream: ServerStream,
    mut requests: mpsc::UnboundedReceiver<ClientRequest>,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
) -> Option<String> {
    let (mut ws_sender, mut ws_receiver) = stream.split();

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    if let Err(e) = ws_sender.close().await {
                        log!("Failed to close connection: {}", e);
                    }
                    return None;
                };
                let buf = request.to_proto().encode_to_vec();
                if let Err(e) = ws_sender.send(Message::Binary(buf.into())).await {
                    return Some(format!("Failed to send to server: {}", e));
                }
            }
            frame = ws_receiver.next() => {
                let data = match frame {
                    Some(Ok(Message::Binary(data))) => data,
                    Some(Ok(Message::Close(_))) | None => {
                        return Some("Server closed the connection".to_string());
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Some(format!("Connection error: {}", e)),
                };

                match ServerMessage::decode(&data[..]) {
                    Ok(message) => match ServerEvent::from_proto(message) {
                        Some(event) => report(events, ConnectionEvent::Server(event)),
                        None => log!("Ignoring empty server message"),
                    },
                    Err(e) => log!("Failed to decode server message: {}", e),
                }
            }
        }
    }
}

fn report(events: &mpsc::UnboundedSender<ConnectionEvent>, event: ConnectionEvent) {
    if let Err(e) = events.send(event) {
        log!("Dropping connection event, receiver gone: {:?}", e.0);
    }
}
