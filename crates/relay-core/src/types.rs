//! Core identifiers, connection states and errors for the relay

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for relay connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness of a connection as seen by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection is open and accepting outbound messages
    Connected,
    /// Transport has started closing the socket
    Closing,
    /// Connection is closed
    Closed,
    /// Connection failed with a transport error
    Failed(String),
}

impl ConnectionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Operational errors raised while talking to a connection
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send queue closed for connection {0}")]
    SendQueueClosed(ConnectionId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Validation failures reported back to the offending client.
///
/// The `Display` text is exactly what the client sees in the `error` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Channel name is required")]
    ChannelRequired,

    #[error("You must join the channel first")]
    NotAMember,
}
