//! # relay-core
//!
//! Transport-agnostic core of a JSON channel relay. Connections join named
//! channels and every message published to a channel is fanned out to all of
//! its members.
//!
//! - [`registry`] - channel membership
//! - [`metadata`] - per-channel descriptive state
//! - [`router`] - protocol handling and fan-out
//! - [`handler`] - lifecycle trait implemented by the router, driven by a transport
//!
//! ```rust
//! use relay_core::{Connection, ConnectionHandler, MessageRouter};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let router = MessageRouter::new();
//! let (conn, mut outbound) = Connection::new();
//!
//! router.on_open(&conn).await;
//! router.on_message(&conn, json!({"type": "join", "channel": "alpha"})).await;
//!
//! assert_eq!(router.members("alpha").await, vec![conn.id]);
//! assert!(outbound.try_recv().is_ok());
//! # });
//! ```

pub mod connection;
pub mod handler;
pub mod metadata;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod types;


pub use connection::Connection;
pub use handler::ConnectionHandler;
pub use metadata::{ChannelMetadata, MetadataStore};
pub use protocol::{ChannelSnapshot, ClientMessage, Sender, ServerMessage, SystemNotice};
pub use registry::{ConnectionRegistry, JoinOutcome, LeaveOutcome, Membership};
pub use router::{MessageRouter, RouterStats};
pub use types::{ConnectionId, ConnectionState, ProtocolError, RelayError, RelayResult};
