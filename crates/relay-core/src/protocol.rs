//! JSON envelopes exchanged with relay clients
//!
//! Inbound payloads arrive as already-decoded [`serde_json::Value`]s and are
//! interpreted leniently: fields may be missing or carry the wrong JSON type,
//! which the router turns into protocol errors instead of decode failures.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::{ProtocolError, RelayResult};

/// Messages a client may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        channel: Option<Value>,
        #[serde(default, rename = "documentName")]
        document_name: Option<Value>,
        #[serde(default, deserialize_with = "present")]
        id: Option<Value>,
    },
    ListChannels {},
    Message {
        #[serde(default)]
        channel: Option<Value>,
        #[serde(default, deserialize_with = "present")]
        message: Option<Value>,
    },
}

/// A field that is present maps to `Some`, even when it is JSON `null`;
/// only an absent field falls back to `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ClientMessage {
    /// Interpret a decoded payload. Returns `None` for anything that is not an
    /// object with a known `type`.
    pub fn from_value(value: Value) -> Option<Self> {
        // serde would also accept `["join", ...]` as a tagged sequence
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Extract a usable channel name: a non-empty JSON string.
pub fn channel_name(raw: Option<&Value>) -> Result<&str, ProtocolError> {
    match raw.and_then(Value::as_str) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ProtocolError::ChannelRequired),
    }
}

/// Extract an optional document name; only non-empty strings count.
pub fn document_name(raw: Option<&Value>) -> Option<&str> {
    raw.and_then(Value::as_str).filter(|name| !name.is_empty())
}

/// Messages the relay sends to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    System {
        message: SystemNotice,
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },
    Error {
        message: String,
    },
    ChannelsList {
        channels: Vec<ChannelSnapshot>,
    },
    Broadcast {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
        sender: Sender,
        channel: String,
    },
}

impl ServerMessage {
    pub fn system<T: Into<String>>(text: T) -> Self {
        Self::System {
            message: SystemNotice::Text(text.into()),
            channel: None,
        }
    }

    pub fn channel_notice<T: Into<String>>(text: T, channel: &str) -> Self {
        Self::System {
            message: SystemNotice::Text(text.into()),
            channel: Some(channel.to_string()),
        }
    }

    pub fn join_ack(id: Option<Value>, channel: &str) -> Self {
        Self::System {
            message: SystemNotice::Ack {
                id,
                result: format!("Connected to channel: {}", channel),
            },
            channel: Some(channel.to_string()),
        }
    }

    pub fn error(err: &ProtocolError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> RelayResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Body of a `system` envelope: plain text or a structured join acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SystemNotice {
    Text(String),
    Ack {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        result: String,
    },
}

/// Marks whether a broadcast copy is the sender's own echo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sender {
    You,
    User,
}

/// One entry of a `channels_list` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(serialize_with = "iso_millis")]
    pub connected_at: DateTime<Utc>,
    pub client_count: usize,
}

fn iso_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
