// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-to-point and broadcast agent messages.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::crdt::Doc;
use crate::delivery::DeliveryLedger;

/// Local retention window: read messages older than this are pruned.
pub const MESSAGE_READ_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Cap on messages retained per coordinator sweep, newest first.
pub const MAX_RETAINED_MESSAGES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from_agent: String,
    pub to_agents: Vec<String>,
    pub content: String,
    pub created_at: u64,
    #[serde(default)]
    pub read_by_agents: HashSet<String>,
    #[serde(default)]
    pub delivery: DeliveryLedger,
}

impl Message {
    pub fn is_broadcast(&self) -> bool {
        self.to_agents.is_empty()
    }

    pub fn is_addressed_to(&self, agent: &str) -> bool {
        self.is_broadcast() || self.to_agents.iter().any(|a| a == agent)
    }

    pub fn is_read_by(&self, agent: &str) -> bool {
        self.read_by_agents.contains(agent)
    }

    pub fn mark_read(&mut self, agent: impl Into<String>) {
        self.read_by_agents.insert(agent.into());
    }

    /// Fully read: every named receiver has read it. Broadcasts are never
    /// considered fully read (receiver set is open-ended), so they're only
    /// pruned via the count cap, never via the read-retention window.
    pub fn is_fully_read(&self) -> bool {
        !self.is_broadcast() && self.to_agents.iter().all(|a| self.read_by_agents.contains(a))
    }

    /// Eligible for the 24h read-retention sweep: fully read and older than
    /// [`MESSAGE_READ_RETENTION_SECS`] relative to `now`. Unread messages are
    /// never dropped by this rule.
    pub fn is_retention_eligible(&self, now: u64) -> bool {
        self.is_fully_read() && now.saturating_sub(self.created_at) > MESSAGE_READ_RETENTION_SECS
    }
}

pub type MessageMap = HashMap<String, Message>;

pub const COLLECTION: &str = "messages";

pub fn load(doc: &Doc) -> MessageMap {
    doc.entries(COLLECTION)
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|m| (k, m)))
        .collect()
}

pub fn get(doc: &Doc, id: &str) -> Option<Message> {
    doc.get(COLLECTION, id).and_then(|v| serde_json::from_value(v).ok())
}

pub fn put(doc: &Doc, message: &Message) {
    doc.set_serialized(COLLECTION, &message.id, message);
}

pub fn remove(doc: &Doc, id: &str) {
    doc.delete(COLLECTION, id);
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
