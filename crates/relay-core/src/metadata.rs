//! Channel metadata store

use crate::protocol::ChannelSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Descriptive state for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMetadata {
    pub document_name: Option<String>,
    pub connected_at: DateTime<Utc>,
    /// Mirrors the registry's member count; only written via `set_count`
    pub client_count: usize,
}

/// Per-channel metadata keyed by channel name
#[derive(Debug, Default)]
pub struct MetadataStore {
    channels: HashMap<String, ChannelMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record if missing and backfill a document name that was
    /// never set. An existing non-empty document name is left alone.
    pub fn ensure(&mut self, channel: &str, document_name: Option<&str>) {
        let metadata = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| {
                debug!("Created metadata for channel '{}'", channel);
                ChannelMetadata {
                    document_name: None,
                    connected_at: Utc::now(),
                    client_count: 0,
                }
            });

        let missing = metadata
            .document_name
            .as_deref()
            .map_or(true, str::is_empty);
        if let Some(name) = document_name.filter(|_| missing) {
            metadata.document_name = Some(name.to_string());
        }
    }

    pub fn set_count(&mut self, channel: &str, count: usize) {
        if let Some(metadata) = self.channels.get_mut(channel) {
            metadata.client_count = count;
        }
    }

    pub fn remove(&mut self, channel: &str) -> Option<ChannelMetadata> {
        let removed = self.channels.remove(channel);
        if removed.is_some() {
            debug!("Removed metadata for empty channel '{}'", channel);
        }
        removed
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelMetadata> {
        self.channels.get(channel)
    }

    /// Snapshot every channel, sorted by name
    pub fn list(&self) -> Vec<ChannelSnapshot> {
        let mut snapshots: Vec<ChannelSnapshot> = self
            .channels
            .iter()
            .map(|(channel, metadata)| ChannelSnapshot {
                channel: channel.clone(),
                document_name: metadata.document_name.clone(),
                connected_at: metadata.connected_at,
                client_count: metadata.client_count,
            })
            .collect();
        snapshots.sort_by(|a, b| a.channel.cmp(&b.channel));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
