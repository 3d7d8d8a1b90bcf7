use std::future::Future;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
};

use common::log;

use crate::broadcaster::Broadcaster;
use crate::room_service::RoomService;
use crate::server_config::ServerConfig;
use crate::ws_handler::handle_websocket;

#[derive(Clone)]
pub struct WebServerState {
    pub room_service: RoomService,
    pub broadcaster: Broadcaster,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub game: &'static str,
}

pub fn build_router(state: WebServerState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(health_handler))
        .route("/ws", get(ws_upgrade_handler));

    if let Some(path) = &config.static_files_path {
        app = app.nest_service("/play", ServeDir::new(path));
    }

    app.layer(cors_layer(&config.allowed_origins)).with_state(state)
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                log!("Ignoring allowed origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

pub async fn run_web_server<F>(
    state: WebServerState,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let app = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log!("Duel server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(health())
}

pub fn health() -> HealthResponse {
    HealthResponse {
        status: "ok",
        game: "duel",
    }
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<WebServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use common::connection::{ConnectionEvent, spawn_connection};
    use common::protocol::{ClientRequest, ServerEvent};

    use crate::room_registry::RoomRegistry;

    async fn serve_on_ephemeral_port() -> String {
        let broadcaster = Broadcaster::new();
        let state = WebServerState {
            room_service: RoomService::new(RoomRegistry::with_seed(3), broadcaster.clone()),
            broadcaster,
        };
        let app = build_router(state, &ServerConfig::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("ws://{}/ws", addr)
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> ServerEvent {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for server event");
        match event {
            Some(ConnectionEvent::Server(event)) => event,
            other => panic!("unexpected connection event: {:?}", other),
        }
    }

    #[test]
    fn test_health_payload() {
        assert_eq!(
            health(),
            HealthResponse {
                status: "ok",
                game: "duel"
            }
        );
    }

    #[tokio::test]
    async fn test_two_clients_play_over_websocket() {
        let url = serve_on_ephemeral_port().await;
        let (host, mut host_events) = spawn_connection(url.clone());
        let (guest, mut guest_events) = spawn_connection(url);

        assert!(host.send(ClientRequest::CreateRoom));
        let ServerEvent::RoomCreated(code) = next_event(&mut host_events).await else {
            panic!("expected room code");
        };
        assert_eq!(code.len(), 5);

        assert!(guest.send(ClientRequest::JoinRoom(code.clone())));
        assert_eq!(next_event(&mut guest_events).await, ServerEvent::JoinAccepted(code));
        assert_eq!(next_event(&mut guest_events).await, ServerEvent::GameStarted);
        assert_eq!(next_event(&mut host_events).await, ServerEvent::GameStarted);

        host.send(ClientRequest::Move(4));
        assert_eq!(next_event(&mut guest_events).await, ServerEvent::OpponentMoved(4));
        guest.send(ClientRequest::Move(0));
        assert_eq!(next_event(&mut host_events).await, ServerEvent::OpponentMoved(0));

        guest.send(ClientRequest::LeaveRoom);
        assert_eq!(next_event(&mut host_events).await, ServerEvent::OpponentLeft);
    }

    #[tokio::test]
    async fn test_unknown_room_is_rejected_over_websocket() {
        let url = serve_on_ephemeral_port().await;
        let (guest, mut guest_events) = spawn_connection(url);

        guest.send(ClientRequest::JoinRoom(common::RoomCode::new("ZZZZZ".to_string())));
        assert!(matches!(
            next_event(&mut guest_events).await,
            ServerEvent::JoinRejected(_)
        ));
    }
}
