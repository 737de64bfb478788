//! Lifecycle interface between a transport and the relay core

use crate::connection::Connection;
use async_trait::async_trait;
use serde_json::Value;

/// Events a transport dispatches for every connection it accepts.
///
/// Calls for a single connection arrive in order; calls for different
/// connections may run concurrently.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// The transport accepted a new connection
    async fn on_open(&self, connection: &Connection);

    /// A payload was received and decoded as JSON
    async fn on_message(&self, connection: &Connection, payload: Value);

    /// The connection is gone. Called once per connection.
    async fn on_close(&self, connection: &Connection);
}
