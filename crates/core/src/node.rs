// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node admission: gateway identities, bootstrap invites, and pre-upgrade
//! WebSocket tickets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::agent::AgentMap;
use crate::crdt::Doc;
use crate::error::{ErrorKind, ToolError};
use crate::ids::{AgentInviteToken, InviteToken, NodeId, WsTicketId};
use crate::pulse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Backbone,
    Edge,
}

crate::simple_display! {
    Tier {
        Backbone => "backbone",
        Edge => "edge",
    }
}

/// A process-level identity admitted into the mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub tier: Tier,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    pub added_by: String,
    pub added_at: u64,
}

impl Node {
    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.contains(cap)
    }

    pub fn is_admin(&self) -> bool {
        self.has_capability("admin")
    }
}

/// Minimum and default time-to-live for minted credentials, in seconds.
pub const WS_TICKET_MIN_TTL_SECS: u64 = 5;
pub const WS_TICKET_MAX_TTL_SECS: u64 = 600;
pub const WS_TICKET_DEFAULT_TTL_SECS: u64 = 60;

/// Single-use node-admission credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInvite {
    pub tier: Tier,
    pub expires_at: u64,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<u64>,
}

impl PendingInvite {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// Pre-upgrade admission gate minted from a consumed (but not yet finalized)
/// invite — lets a connecting process prove it holds a valid invite before
/// the WebSocket upgrade completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsTicket {
    pub ticket: WsTicketId,
    pub invite_token: InviteToken,
    pub expected_node_id: NodeId,
    pub created_by: String,
    pub created_at: u64,
    pub expires_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<u64>,
}

impl WsTicket {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// Single-use agent-admission invite. Accepting one mints a permanent agent
/// token shown only once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInvite {
    pub agent_id: String,
    pub token_hash: String,
    pub created_at: u64,
    pub expires_at: u64,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<String>,
}

impl AgentInvite {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: u64) -> bool {
        self.used_at.is_none() && self.revoked_at.is_none() && !self.is_expired(now)
    }
}

pub type AgentInviteId = AgentInviteToken;

pub type AgentInviteMap = HashMap<String, AgentInvite>;

pub const AGENT_INVITE_COLLECTION: &str = "agent_invites";

pub fn load_agent_invites(doc: &Doc) -> AgentInviteMap {
    doc.entries(AGENT_INVITE_COLLECTION)
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|i| (k, i)))
        .collect()
}

pub fn get_agent_invite(doc: &Doc, token: &str) -> Option<AgentInvite> {
    doc.get(AGENT_INVITE_COLLECTION, token).and_then(|v| serde_json::from_value(v).ok())
}

pub fn put_agent_invite(doc: &Doc, token: &str, invite: &AgentInvite) {
    doc.set_serialized(AGENT_INVITE_COLLECTION, token, invite);
}

pub type NodeMap = HashMap<String, Node>;

pub const NODE_COLLECTION: &str = "nodes";
pub const INVITE_COLLECTION: &str = "invites";
pub const WS_TICKET_COLLECTION: &str = "ws_tickets";

pub fn load_nodes(doc: &Doc) -> NodeMap {
    doc.entries(NODE_COLLECTION)
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|n| (k, n)))
        .collect()
}

pub fn get_node(doc: &Doc, node_id: &str) -> Option<Node> {
    doc.get(NODE_COLLECTION, node_id).and_then(|v| serde_json::from_value(v).ok())
}

pub fn put_node(doc: &Doc, node_id: &str, node: &Node) {
    doc.set_serialized(NODE_COLLECTION, node_id, node);
}

pub fn get_invite(doc: &Doc, token: &str) -> Option<PendingInvite> {
    doc.get(INVITE_COLLECTION, token).and_then(|v| serde_json::from_value(v).ok())
}

pub fn put_invite(doc: &Doc, token: &str, invite: &PendingInvite) {
    doc.set_serialized(INVITE_COLLECTION, token, invite);
}

pub fn get_ws_ticket(doc: &Doc, ticket: &str) -> Option<WsTicket> {
    doc.get(WS_TICKET_COLLECTION, ticket).and_then(|v| serde_json::from_value(v).ok())
}

pub fn put_ws_ticket(doc: &Doc, ticket: &str, value: &WsTicket) {
    doc.set_serialized(WS_TICKET_COLLECTION, ticket, value);
}

/// Mint an opaque, single-use pre-upgrade ticket from a still-unused invite.
/// Does not consume the invite — only [`consume_ws_ticket`] does that,
/// atomically, once the connecting peer actually presents the ticket.
pub fn mint_ws_ticket_from_invite(
    doc: &Doc,
    invite_token: &str,
    expected_node_id: &NodeId,
    ttl_secs: u64,
    created_by: impl Into<String>,
    now: u64,
) -> Result<WsTicket, ToolError> {
    let ttl_secs = ttl_secs.clamp(WS_TICKET_MIN_TTL_SECS, WS_TICKET_MAX_TTL_SECS);
    let invite = get_invite(doc, invite_token).ok_or_else(|| ToolError::not_found("invite"))?;
    if invite.is_used() {
        return Err(ToolError::new(ErrorKind::AlreadyUsed, "invite already used"));
    }
    if invite.is_expired(now) {
        return Err(ToolError::new(ErrorKind::Expired, "invite expired"));
    }
    if let Some(expected) = &invite.expected_node_id {
        if expected != expected_node_id {
            return Err(ToolError::new(ErrorKind::NodeMismatch, "invite bound to a different node id"));
        }
    }

    let ticket = WsTicket {
        ticket: WsTicketId::new(),
        invite_token: InviteToken::from_string(invite_token),
        expected_node_id: expected_node_id.clone(),
        created_by: created_by.into(),
        created_at: now,
        expires_at: now + ttl_secs,
        used_at: None,
    };
    put_ws_ticket(doc, ticket.ticket.as_str(), &ticket);
    Ok(ticket)
}

/// Check expiry, single-use, and expected identity, then atomically consume
/// the underlying invite and admit `presented_node_id` into `nodes`.
pub fn consume_ws_ticket(doc: &Doc, ticket_id: &str, presented_node_id: &NodeId, now: u64) -> Result<(), ToolError> {
    let mut ticket = get_ws_ticket(doc, ticket_id).ok_or_else(|| ToolError::not_found("ws ticket"))?;
    if ticket.is_used() {
        return Err(ToolError::new(ErrorKind::AlreadyUsed, "ticket already used"));
    }
    if ticket.is_expired(now) {
        return Err(ToolError::new(ErrorKind::Expired, "ticket expired"));
    }
    if &ticket.expected_node_id != presented_node_id {
        return Err(ToolError::new(ErrorKind::NodeMismatch, "ticket was minted for a different node id"));
    }

    ticket.used_at = Some(now);
    put_ws_ticket(doc, ticket_id, &ticket);

    let mut invite = get_invite(doc, ticket.invite_token.as_str()).ok_or_else(|| ToolError::not_found("invite"))?;
    invite.used_by_node = Some(presented_node_id.clone());
    invite.used_at = Some(now);
    let tier = invite.tier;
    let created_by = invite.created_by.clone();
    put_invite(doc, ticket.invite_token.as_str(), &invite);

    put_node(
        doc,
        presented_node_id.as_str(),
        &Node { name: presented_node_id.as_str().to_string(), tier, capabilities: BTreeSet::new(), added_by: created_by, added_at: now },
    );
    Ok(())
}

/// A node is authorized if it's already admitted, is actively heartbeating,
/// or hosts an internal agent — or if `nodes` is empty (bootstrap: the first
/// invite consumption is what pins membership going forward).
pub fn is_node_authorized(doc: &Doc, node_id: &NodeId, agents: &AgentMap, now: u64) -> bool {
    let nodes = load_nodes(doc);
    if nodes.is_empty() {
        return true;
    }
    if nodes.contains_key(node_id.as_str()) {
        return true;
    }
    if let Some(p) = pulse::get(doc, node_id.as_str()) {
        if !pulse::is_stale(&p, now) {
            return true;
        }
    }
    !crate::agent::internal_agents_on(agents, node_id).is_empty()
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
