// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool/command surface: every mutation the host plugin contract exposes
//! (`registerTool`) routes through one of these functions, so validation
//! and authorization live in exactly one place rather than being
//! duplicated across call sites.

pub mod agents;
pub mod coordination;
pub mod messages;
pub mod tasks;

use serde::Serialize;

use mesh_core::ids::NodeId;

/// Identity and authorization facts resolved by the caller (daemon's
/// admission layer) before a tool function runs. This crate never touches
/// invites, tickets, or token hashes directly — same separation
/// [`mesh_transport::AuthGate`] draws for the sync transport.
#[derive(Debug, Clone)]
pub struct Caller {
    pub agent_id: String,
    pub node_id: Option<NodeId>,
    pub is_admin: bool,
}

impl Caller {
    pub fn internal(agent_id: impl Into<String>, node_id: NodeId) -> Self {
        Self { agent_id: agent_id.into(), node_id: Some(node_id), is_admin: false }
    }

    pub fn admin(agent_id: impl Into<String>, node_id: NodeId) -> Self {
        Self { agent_id: agent_id.into(), node_id: Some(node_id), is_admin: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// `{ content:[{type:"text",text:<json>}], details:<json> }` envelope every
/// tool call returns, success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
    pub details: serde_json::Value,
}

impl ToolResponse {
    pub fn ok(details: serde_json::Value) -> Self {
        Self { content: vec![ToolContent { kind: "text", text: details.to_string() }], details }
    }

    /// Serialize `value` into the success envelope. Falls back to an
    /// `{"error": ...}` details payload (never panics) if `value` somehow
    /// can't serialize, so a caller can build this straight off a domain
    /// type without threading a `Result` through every call site.
    pub fn ok_value<T: Serialize>(value: &T) -> Self {
        let details = serde_json::to_value(value).unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() }));
        Self::ok(details)
    }
}

impl From<mesh_core::ToolError> for ToolResponse {
    fn from(err: mesh_core::ToolError) -> Self {
        let details = serde_json::json!({ "error": err.to_string(), "kind": err.kind.to_string() });
        ToolResponse { content: vec![ToolContent { kind: "text", text: details.to_string() }], details }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
