//! HTTP/WebSocket edge: the health endpoint and the socket acceptor that
//! feeds authenticated connections into the session router.

use crate::error::{CoordinatorError, Result};
use crate::session::{ClientMessage, ServerMessage, SessionRouter, Transport};
use async_trait::async_trait;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SessionRouter>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Outbound half of one WebSocket, behind the Transport seam.
struct WsTransport {
    tx: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn deliver(&self, message: &ServerMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| CoordinatorError::OperationFailed("websocket closed".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        self.tx
            .send(Message::Ping(Vec::new().into()))
            .map_err(|_| CoordinatorError::OperationFailed("websocket closed".to_string()))
    }

    async fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let transport = Arc::new(WsTransport { tx: tx.clone() });

    // First frame must be AUTH; everything else closes the socket.
    let player = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Auth {
                        oid_user,
                        token,
                        discord_id,
                    }) => {
                        match state
                            .router
                            .authenticate(oid_user, &token, discord_id, transport.clone())
                            .await
                        {
                            Ok(player) => break player,
                            Err(e) => {
                                tracing::debug!(error = %e, "websocket auth rejected");
                                let _ = tx.send(Message::Close(None));
                                writer.abort();
                                return;
                            }
                        }
                    }
                    _ => {
                        let _ = tx.send(Message::Close(None));
                        writer.abort();
                        return;
                    }
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            _ => {
                writer.abort();
                return;
            }
        }
    };

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(message) => state.router.handle(player, message).await,
                Err(e) => {
                    tracing::debug!(player = %player, error = %e, "unparseable client frame")
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
            Err(_) => break,
        }
    }

    state.router.disconnected(player).await;
    writer.abort();
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
