// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry: coordination-endpoint identities distinct from node
//! (gateway) identities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::crdt::Doc;
use crate::ids::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Runs on a specific gateway and receives auto-dispatch.
    Internal,
    /// Polls for work from outside the mesh.
    External,
}

crate::simple_display! {
    AgentKind {
        Internal => "internal",
        External => "external",
    }
}

/// Hashed bearer credential for an external agent. The plaintext token is
/// shown once at issuance/acceptance and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAuth {
    pub token_hash: String,
    pub issued_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<u64>,
    /// First 12 characters of the plaintext token, for display only.
    pub token_hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by_agent: Option<String>,
}

impl AgentAuth {
    /// Hash a plaintext token the way it's stored (`sha256:<hex>`).
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("sha256:{:x}", hasher.finalize())
    }

    pub fn hint(token: &str) -> String {
        crate::id::short(token, 12).to_string()
    }

    /// Constant-time comparison of a presented plaintext token against the
    /// stored hash.
    pub fn verify(&self, presented: &str) -> bool {
        let candidate = Self::hash_token(presented);
        constant_time_eq(candidate.as_bytes(), self.token_hash.as_bytes())
    }
}

/// Generate a random bearer-token plaintext, shown once at issuance or
/// invite acceptance and never stored (only its hash is).
pub fn generate_token() -> String {
    nanoid::nanoid!(32)
}

/// Compares two byte strings in time independent of where they first
/// differ, to avoid leaking token material through timing side channels.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Gateway the agent runs on. `None` for agents with no fixed home.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<NodeId>,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub registered_at: u64,
    pub registered_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AgentAuth>,
}

impl AgentRecord {
    pub fn is_internal_on(&self, node: &NodeId) -> bool {
        self.kind == AgentKind::Internal && self.gateway.as_ref() == Some(node)
    }
}

pub type AgentMap = HashMap<String, AgentRecord>;

pub const COLLECTION: &str = "agents";

pub fn load(doc: &Doc) -> AgentMap {
    doc.entries(COLLECTION)
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|a| (k, a)))
        .collect()
}

pub fn get(doc: &Doc, agent_id: &str) -> Option<AgentRecord> {
    doc.get(COLLECTION, agent_id).and_then(|v| serde_json::from_value(v).ok())
}

pub fn put(doc: &Doc, agent_id: &str, record: &AgentRecord) {
    doc.set_serialized(COLLECTION, agent_id, record);
}

/// Every agent id registered as `internal` on the given node.
pub fn internal_agents_on(agents: &AgentMap, node: &NodeId) -> Vec<String> {
    agents.iter().filter(|(_, rec)| rec.is_internal_on(node)).map(|(id, _)| id.clone()).collect()
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
