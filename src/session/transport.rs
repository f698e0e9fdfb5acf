use super::messages::ServerMessage;
use crate::error::{CoordinatorError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One authenticated player's bidirectional channel. The framing itself
/// (WebSocket, TCP, test harness) lives outside the coordinator.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, message: &ServerMessage) -> Result<()>;

    /// Liveness probe for the heartbeat sweep.
    async fn ping(&self) -> Result<()>;

    async fn close(&self);
}

/// Channel-backed transport for tests and embedding: delivered messages
/// appear on the paired receiver.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn deliver(&self, message: &ServerMessage) -> Result<()> {
        self.tx
            .send(message.clone())
            .map_err(|_| CoordinatorError::OperationFailed("transport closed".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        if self.tx.is_closed() {
            return Err(CoordinatorError::OperationFailed(
                "transport closed".to_string(),
            ));
        }
        Ok(())
    }

    async fn close(&self) {}
}
