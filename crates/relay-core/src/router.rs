//! Message router: applies inbound client messages to channel state
//! and fans the resulting notifications out to channel members.

use crate::connection::Connection;
use crate::handler::ConnectionHandler;
use crate::metadata::{ChannelMetadata, MetadataStore};
use crate::protocol::{self, ChannelSnapshot, ClientMessage, Sender, ServerMessage};
use crate::registry::{ConnectionRegistry, LeaveOutcome, Membership};
use crate::types::{ConnectionId, ProtocolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const WELCOME: &str = "Please join a channel to start chatting";
pub const MEMBER_JOINED: &str = "A new user has joined the channel";
pub const MEMBER_LEFT: &str = "A user has left the channel";

/// Everything guarded by the router's lock
#[derive(Debug, Default)]
struct RelayState {
    /// Open connections by id
    connections: HashMap<ConnectionId, Connection>,
    registry: ConnectionRegistry,
    metadata: MetadataStore,
}

impl RelayState {
    /// Queue a message for one connection. Failures are logged and dropped.
    async fn deliver(&self, connection: &Connection, message: ServerMessage) {
        if let Err(e) = connection.send(message).await {
            debug!("Skipping delivery to {}: {}", connection.id, e);
        }
    }

    /// Queue a message for every live member of a channel except `exclude`
    async fn notify_members(
        &self,
        channel: &str,
        exclude: ConnectionId,
        message: &ServerMessage,
    ) -> usize {
        let mut delivered = 0;
        for member_id in self.registry.list_members(channel) {
            if member_id == exclude {
                continue;
            }
            match self.connections.get(&member_id) {
                Some(member) => {
                    if member.send(message.clone()).await.is_ok() {
                        delivered += 1;
                    }
                }
                None => warn!("Member {} of '{}' has no live connection", member_id, channel),
            }
        }
        delivered
    }
}

/// Snapshot of router-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub connections: usize,
    pub channels: usize,
}

/// Coordinates channel membership, metadata and message fan-out.
///
/// All state sits behind one lock; each operation holds the write guard
/// across both the mutation and the notifications it triggers.
#[derive(Debug, Default)]
pub struct MessageRouter {
    state: RwLock<RelayState>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection and greet it
    pub async fn connect(&self, connection: &Connection) {
        let mut state = self.state.write().await;
        state.connections.insert(connection.id, connection.clone());
        info!("Client connected: {}", connection.id);
        state.deliver(connection, ServerMessage::system(WELCOME)).await;
    }

    /// Join `channel`, confirm to the sender and announce to the others
    pub async fn join(
        &self,
        connection: &Connection,
        channel: &str,
        document_name: Option<&str>,
        request_id: Option<Value>,
    ) {
        let mut state = self.state.write().await;
        state
            .connections
            .entry(connection.id)
            .or_insert_with(|| connection.clone());

        let outcome = state.registry.join(channel, connection.id);
        state.metadata.ensure(channel, document_name);
        state.metadata.set_count(channel, outcome.member_count);

        info!(
            "Connection {} joined channel '{}' ({} members)",
            connection.id, channel, outcome.member_count
        );

        state
            .deliver(
                connection,
                ServerMessage::channel_notice(format!("Joined channel: {}", channel), channel),
            )
            .await;
        state
            .deliver(connection, ServerMessage::join_ack(request_id, channel))
            .await;

        let notice = ServerMessage::channel_notice(MEMBER_JOINED, channel);
        state.notify_members(channel, connection.id, &notice).await;
    }

    /// Broadcast to every member of `channel`, the sender included.
    /// Returns how many copies were queued.
    pub async fn publish(
        &self,
        connection: &Connection,
        channel: &str,
        message: Option<Value>,
    ) -> Result<usize, ProtocolError> {
        let state = self.state.write().await;
        if !state.registry.is_member(channel, connection.id) {
            return Err(ProtocolError::NotAMember);
        }

        let mut delivered = 0;
        for member_id in state.registry.list_members(channel) {
            let Some(member) = state.connections.get(&member_id) else {
                continue;
            };
            let sender = if member_id == connection.id {
                Sender::You
            } else {
                Sender::User
            };
            let copy = ServerMessage::Broadcast {
                message: message.clone(),
                sender,
                channel: channel.to_string(),
            };
            match member.send(copy).await {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Broadcast to {} skipped: {}", member_id, e),
            }
        }

        debug!(
            "Broadcast on '{}' from {} reached {} members",
            channel, connection.id, delivered
        );
        Ok(delivered)
    }

    /// Drop the connection from every channel, pruning empty ones and
    /// telling the remaining members.
    pub async fn disconnect(&self, connection: &Connection) {
        let mut state = self.state.write().await;
        let known = state.connections.remove(&connection.id).is_some();

        let departures = state.registry.leave_all(connection.id);
        for (channel, outcome) in &departures {
            match outcome {
                LeaveOutcome::Emptied => {
                    state.metadata.remove(channel);
                }
                LeaveOutcome::Remaining(count) => {
                    state.metadata.set_count(channel, *count);
                    let notice = ServerMessage::channel_notice(MEMBER_LEFT, channel);
                    state.notify_members(channel, connection.id, &notice).await;
                }
                LeaveOutcome::NotMember => {}
            }
        }

        if known || !departures.is_empty() {
            info!(
                "Client disconnected: {} (left {} channels)",
                connection.id,
                departures.len()
            );
        }
    }

    pub async fn list_channels(&self) -> Vec<ChannelSnapshot> {
        self.state.read().await.metadata.list()
    }

    pub async fn channel_metadata(&self, channel: &str) -> Option<ChannelMetadata> {
        self.state.read().await.metadata.get(channel).cloned()
    }

    pub async fn members(&self, channel: &str) -> Vec<ConnectionId> {
        self.state.read().await.registry.list_members(channel)
    }

    pub async fn membership(&self, connection_id: ConnectionId) -> Membership {
        self.state.read().await.registry.membership(connection_id)
    }

    pub async fn stats(&self) -> RouterStats {
        let state = self.state.read().await;
        RouterStats {
            connections: state.connections.len(),
            channels: state.registry.channel_count(),
        }
    }

    async fn reply(&self, connection: &Connection, message: ServerMessage) {
        if let Err(e) = connection.send(message).await {
            debug!("Reply to {} dropped: {}", connection.id, e);
        }
    }

    async fn reject(&self, connection: &Connection, err: ProtocolError) {
        debug!("Rejecting request from {}: {}", connection.id, err);
        self.reply(connection, ServerMessage::error(&err)).await;
    }
}

#[async_trait]
impl ConnectionHandler for MessageRouter {
    async fn on_open(&self, connection: &Connection) {
        self.connect(connection).await;
    }

    async fn on_message(&self, connection: &Connection, payload: Value) {
        let Some(message) = ClientMessage::from_value(payload) else {
            debug!("Ignoring unrecognized message from {}", connection.id);
            return;
        };

        match message {
            ClientMessage::Join {
                channel,
                document_name,
                id,
            } => match protocol::channel_name(channel.as_ref()) {
                Ok(name) => {
                    let document = protocol::document_name(document_name.as_ref());
                    self.join(connection, name, document, id).await;
                }
                Err(e) => self.reject(connection, e).await,
            },
            ClientMessage::ListChannels {} => {
                let channels = self.list_channels().await;
                self.reply(connection, ServerMessage::ChannelsList { channels })
                    .await;
            }
            ClientMessage::Message { channel, message } => {
                let result = match protocol::channel_name(channel.as_ref()) {
                    Ok(name) => self.publish(connection, name, message).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    self.reject(connection, e).await;
                }
            }
        }
    }

    async fn on_close(&self, connection: &Connection) {
        self.disconnect(connection).await;
    }
}
