//! Connection handle shared between the transport and the router

use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, ConnectionState, RelayError, RelayResult};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Cloneable handle to one client's live session.
///
/// The transport owns the socket and drains the receiving half of the
/// outbound queue; the router only ever pushes onto it.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection identifier
    pub id: ConnectionId,
    /// Connection state
    state: Arc<RwLock<ConnectionState>>,
    /// Outbound message queue
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    /// Create a connection together with the receiver the transport drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        Self::with_id(ConnectionId::new())
    }

    pub fn with_id(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection = Self {
            id,
            state: Arc::new(RwLock::new(ConnectionState::Connected)),
            sender,
        };
        (connection, receiver)
    }

    /// Queue a message for delivery. Never blocks.
    pub async fn send(&self, message: ServerMessage) -> RelayResult<()> {
        if !self.is_active().await {
            return Err(RelayError::ConnectionClosed);
        }

        self.sender
            .send(message)
            .map_err(|_| RelayError::SendQueueClosed(self.id))
    }

    /// Get the current connection state
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    pub async fn set_state(&self, state: ConnectionState) {
        debug!("Connection {} state -> {:?}", self.id, state);
        *self.state.write().await = state;
    }

    /// Check if the connection is active
    pub async fn is_active(&self) -> bool {
        self.state().await.is_active()
    }

    /// Mark the connection closed unless it already failed
    pub async fn mark_closed(&self) {
        let mut state = self.state.write().await;
        if !matches!(*state, ConnectionState::Failed(_)) {
            *state = ConnectionState::Closed;
        }
    }
}
