//! Connection registry: which connections belong to which channel
//!
//! The registry is a plain data structure. Callers that share it across tasks
//! must wrap it together with the [`MetadataStore`](crate::metadata::MetadataStore)
//! in a single lock so that a membership change and the metadata update that
//! follows it are observed atomically.

use crate::types::ConnectionId;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Membership tag for a single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Unjoined,
    Joined(BTreeSet<String>),
}

impl Membership {
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }
}

/// Result of [`ConnectionRegistry::join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The channel did not exist before this join
    pub created: bool,
    /// The connection was not already a member
    pub added: bool,
    /// Member count after the join
    pub member_count: usize,
}

/// Result of removing a connection from one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The connection was not in the channel; nothing changed
    NotMember,
    /// The connection left and this many members remain
    Remaining(usize),
    /// The connection was the last member; the channel is gone
    Emptied,
}

/// Authoritative mapping from channel name to member connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Channel name to member set
    channels: HashMap<String, HashSet<ConnectionId>>,
    /// Connection to joined channel names, for lookups without scanning
    memberships: HashMap<ConnectionId, BTreeSet<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a channel, creating the channel if needed.
    /// Joining a channel twice is a no-op.
    pub fn join(&mut self, channel: &str, connection_id: ConnectionId) -> JoinOutcome {
        let created = !self.channels.contains_key(channel);
        let members = self.channels.entry(channel.to_string()).or_default();
        let added = members.insert(connection_id);
        let member_count = members.len();

        if added {
            self.memberships
                .entry(connection_id)
                .or_default()
                .insert(channel.to_string());
            debug!("Connection {} joined channel '{}'", connection_id, channel);
        }

        JoinOutcome {
            created,
            added,
            member_count,
        }
    }

    /// Remove a connection from a channel. Empty channels are dropped.
    pub fn leave(&mut self, channel: &str, connection_id: ConnectionId) -> LeaveOutcome {
        let Some(members) = self.channels.get_mut(channel) else {
            return LeaveOutcome::NotMember;
        };

        if !members.remove(&connection_id) {
            return LeaveOutcome::NotMember;
        }

        if let Some(joined) = self.memberships.get_mut(&connection_id) {
            joined.remove(channel);
            if joined.is_empty() {
                self.memberships.remove(&connection_id);
            }
        }

        debug!("Connection {} left channel '{}'", connection_id, channel);

        if members.is_empty() {
            self.channels.remove(channel);
            LeaveOutcome::Emptied
        } else {
            LeaveOutcome::Remaining(members.len())
        }
    }

    /// Remove a connection from every channel it belongs to
    pub fn leave_all(&mut self, connection_id: ConnectionId) -> Vec<(String, LeaveOutcome)> {
        let joined = self.memberships.get(&connection_id).cloned().unwrap_or_default();

        joined
            .into_iter()
            .map(|channel| {
                let outcome = self.leave(&channel, connection_id);
                (channel, outcome)
            })
            .collect()
    }

    /// Current members of a channel; empty if the channel does not exist
    pub fn list_members(&self, channel: &str) -> Vec<ConnectionId> {
        self.channels
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, channel: &str, connection_id: ConnectionId) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.contains(&connection_id))
    }

    pub fn membership(&self, connection_id: ConnectionId) -> Membership {
        match self.memberships.get(&connection_id) {
            Some(joined) if !joined.is_empty() => Membership::Joined(joined.clone()),
            _ => Membership::Unjoined,
        }
    }

    pub fn member_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, HashSet::len)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
