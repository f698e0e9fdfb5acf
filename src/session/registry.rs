use super::messages::ServerMessage;
use super::transport::Transport;
use crate::error::{CoordinatorError, Result};
use crate::player::PlayerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Fan-out seam the pipeline components send through. Delivery is
/// best-effort; a dead transport is the heartbeat sweep's problem.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_to(&self, player: PlayerId, message: ServerMessage);
    async fn broadcast(&self, players: &[PlayerId], message: ServerMessage);
}

struct Connection {
    transport: Arc<dyn Transport>,
    last_seen: RwLock<Instant>,
}

/// Maps each authenticated identity to its single open transport.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<PlayerId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Bind a transport to an identity. The newer connection loses on a
    /// duplicate.
    pub async fn bind(&self, player: PlayerId, transport: Arc<dyn Transport>) -> Result<()> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&player) {
            return Err(CoordinatorError::AlreadyConnected(player));
        }
        connections.insert(
            player,
            Arc::new(Connection {
                transport,
                last_seen: RwLock::new(Instant::now()),
            }),
        );
        Ok(())
    }

    pub async fn unbind(&self, player: PlayerId) -> bool {
        self.connections.write().await.remove(&player).is_some()
    }

    pub async fn is_connected(&self, player: PlayerId) -> bool {
        self.connections.read().await.contains_key(&player)
    }

    /// Refresh a connection's liveness mark on inbound traffic.
    pub async fn touch(&self, player: PlayerId) {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&player) {
            *connection.last_seen.write().await = Instant::now();
        }
    }

    pub async fn connected_players(&self) -> Vec<PlayerId> {
        self.connections.read().await.keys().copied().collect()
    }

    /// Ping every connection; terminate those idle past `max_idle` whose
    /// ping also fails. Returns the terminated identities so the caller
    /// can run the disconnect cascade.
    pub async fn sweep_stale(&self, max_idle: Duration) -> Vec<PlayerId> {
        let snapshot: Vec<(PlayerId, Arc<Connection>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .map(|(id, conn)| (*id, conn.clone()))
                .collect()
        };

        let mut stale = Vec::new();
        for (player, connection) in snapshot {
            let idle = connection.last_seen.read().await.elapsed();
            if idle < max_idle {
                continue;
            }
            if connection.transport.ping().await.is_ok() {
                *connection.last_seen.write().await = Instant::now();
                continue;
            }
            connection.transport.close().await;
            stale.push(player);
        }

        if !stale.is_empty() {
            let mut connections = self.connections.write().await;
            for player in &stale {
                connections.remove(player);
            }
        }
        stale
    }

    /// Shutdown path: notify and close every transport.
    pub async fn close_all(&self, farewell: ServerMessage) {
        let mut connections = self.connections.write().await;
        for (player, connection) in connections.drain() {
            if let Err(e) = connection.transport.deliver(&farewell).await {
                tracing::debug!(player = %player, error = %e, "farewell delivery failed");
            }
            connection.transport.close().await;
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Outbound for ConnectionRegistry {
    async fn send_to(&self, player: PlayerId, message: ServerMessage) {
        let connection = {
            let connections = self.connections.read().await;
            connections.get(&player).cloned()
        };
        if let Some(connection) = connection {
            if let Err(e) = connection.transport.deliver(&message).await {
                tracing::debug!(player = %player, error = %e, "outbound delivery failed");
            }
        }
    }

    async fn broadcast(&self, players: &[PlayerId], message: ServerMessage) {
        for player in players {
            self.send_to(*player, message.clone()).await;
        }
    }
}
