// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node working context: a small rolling summary of what a node is
//! doing, shared so peers can see current focus without polling tasks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crdt::Doc;

/// Cap on [`NodeContext::active_threads`] and [`NodeContext::recent_decisions`],
/// both kept newest-first.
pub const MAX_ACTIVE_THREADS: usize = 10;
pub const MAX_RECENT_DECISIONS: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_focus: Option<String>,
    #[serde(default)]
    pub active_threads: Vec<String>,
    #[serde(default)]
    pub recent_decisions: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

impl NodeContext {
    pub fn set_focus(&mut self, focus: impl Into<String>, now: u64) {
        self.current_focus = Some(focus.into());
        self.updated_at = Some(now);
    }

    pub fn push_thread(&mut self, thread: impl Into<String>, now: u64) {
        self.active_threads.insert(0, thread.into());
        self.active_threads.truncate(MAX_ACTIVE_THREADS);
        self.updated_at = Some(now);
    }

    pub fn push_decision(&mut self, decision: impl Into<String>, now: u64) {
        self.recent_decisions.insert(0, decision.into());
        self.recent_decisions.truncate(MAX_RECENT_DECISIONS);
        self.updated_at = Some(now);
    }

    pub fn advertise_skills(&mut self, skills: Vec<String>, now: u64) {
        self.skills = skills;
        self.updated_at = Some(now);
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }
}

pub type ContextMap = HashMap<String, NodeContext>;

/// Collection name, keyed by node id.
pub const COLLECTION: &str = "context";

pub fn load(doc: &Doc) -> ContextMap {
    doc.entries(COLLECTION)
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|c| (k, c)))
        .collect()
}

pub fn get(doc: &Doc, node_id: &str) -> NodeContext {
    doc.get(COLLECTION, node_id).and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default()
}

pub fn put(doc: &Doc, node_id: &str, ctx: &NodeContext) {
    doc.set_serialized(COLLECTION, node_id, ctx);
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
