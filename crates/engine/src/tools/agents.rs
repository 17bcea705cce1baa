// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry tools: `register_agent`, `issue_agent_token`,
//! `invite_agent`, `accept_agent_invite`, `list_agents`,
//! `list_agent_invites`, `advertise_skills`, `create_skill_task`.

use mesh_core::{
    agent, context, node, task, AgentAuth, AgentInvite, AgentKind, AgentRecord, Doc, NodeId, Task, TaskId,
    TaskStatus, ToolError,
};

use super::{Caller, ToolResponse};

/// Time-to-live for a freshly minted agent invite.
pub const AGENT_INVITE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

pub fn register_agent(
    doc: &Doc,
    caller: &Caller,
    agent_id: &str,
    name: Option<String>,
    kind: AgentKind,
    gateway: Option<NodeId>,
    now: u64,
) -> ToolResponse {
    match register_agent_inner(doc, caller, agent_id, name, kind, gateway, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn register_agent_inner(
    doc: &Doc,
    caller: &Caller,
    agent_id: &str,
    name: Option<String>,
    kind: AgentKind,
    gateway: Option<NodeId>,
    now: u64,
) -> Result<ToolResponse, ToolError> {
    if agent::get(doc, agent_id).is_some() {
        return Err(ToolError::invalid(format!("agent {agent_id} is already registered")));
    }
    if kind == AgentKind::Internal && gateway.is_none() {
        return Err(ToolError::invalid("internal agents require a gateway node id"));
    }
    let record = AgentRecord { name, gateway, kind, registered_at: now, registered_by: caller.agent_id.clone(), auth: None };
    agent::put(doc, agent_id, &record);
    Ok(ToolResponse::ok(serde_json::json!({ "agentId": agent_id, "record": record })))
}

/// Mint a new bearer token for an existing external agent, overwriting any
/// prior credential (rotation). The plaintext token is returned once.
pub fn issue_agent_token(doc: &Doc, caller: &Caller, agent_id: &str, now: u64) -> ToolResponse {
    match issue_agent_token_inner(doc, caller, agent_id, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn issue_agent_token_inner(doc: &Doc, caller: &Caller, agent_id: &str, now: u64) -> Result<ToolResponse, ToolError> {
    if !caller.is_admin {
        return Err(ToolError::admin_required("issue_agent_token requires an admin capability"));
    }
    let mut record = agent::get(doc, agent_id).ok_or_else(|| ToolError::not_found(agent_id))?;
    if record.kind != AgentKind::External {
        return Err(ToolError::invalid("only external agents take bearer tokens"));
    }
    let token = mesh_core::generate_token();
    let rotated_at = record.auth.as_ref().map(|_| now);
    record.auth = Some(AgentAuth {
        token_hash: AgentAuth::hash_token(&token),
        issued_at: now,
        rotated_at,
        token_hint: AgentAuth::hint(&token),
        accepted_at: None,
        accepted_by_node: None,
        accepted_by_agent: None,
    });
    agent::put(doc, agent_id, &record);
    Ok(ToolResponse::ok(serde_json::json!({ "agentId": agent_id, "token": token })))
}

/// Mint a single-use invite an external process can later redeem via
/// [`accept_agent_invite`] to claim its own bearer token.
pub fn invite_agent(doc: &Doc, caller: &Caller, agent_id: &str, now: u64) -> ToolResponse {
    match invite_agent_inner(doc, caller, agent_id, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn invite_agent_inner(doc: &Doc, caller: &Caller, agent_id: &str, now: u64) -> Result<ToolResponse, ToolError> {
    if !caller.is_admin {
        return Err(ToolError::admin_required("invite_agent requires an admin capability"));
    }
    let token = mesh_core::ids::AgentInviteToken::new();
    let invite = AgentInvite {
        agent_id: agent_id.to_string(),
        token_hash: AgentAuth::hash_token(token.as_str()),
        created_at: now,
        expires_at: now + AGENT_INVITE_TTL_SECS,
        created_by: caller.agent_id.clone(),
        created_by_agent: Some(caller.agent_id.clone()),
        used_at: None,
        used_by_node: None,
        used_by_agent: None,
        revoked_at: None,
        revoked_reason: None,
    };
    node::put_agent_invite(doc, token.as_str(), &invite);
    Ok(ToolResponse::ok(serde_json::json!({ "token": token.to_string(), "agentId": agent_id, "expiresAt": invite.expires_at })))
}

/// Redeem an invite, registering the agent (if not already present) and
/// minting its permanent bearer token. Single-use: the invite is marked
/// consumed atomically with token issuance.
pub fn accept_agent_invite(
    doc: &Doc,
    token: &str,
    accepted_by_node: Option<NodeId>,
    accepted_by_agent: Option<String>,
    now: u64,
) -> ToolResponse {
    match accept_agent_invite_inner(doc, token, accepted_by_node, accepted_by_agent, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn accept_agent_invite_inner(
    doc: &Doc,
    token: &str,
    accepted_by_node: Option<NodeId>,
    accepted_by_agent: Option<String>,
    now: u64,
) -> Result<ToolResponse, ToolError> {
    let mut invite = node::get_agent_invite(doc, token).ok_or_else(|| ToolError::not_found(token))?;
    if invite.used_at.is_some() {
        return Err(ToolError::new(mesh_core::ErrorKind::AlreadyUsed, "agent invite already used"));
    }
    if invite.revoked_at.is_some() {
        return Err(ToolError::new(mesh_core::ErrorKind::AlreadyUsed, "agent invite was revoked"));
    }
    if invite.is_expired(now) {
        return Err(ToolError::new(mesh_core::ErrorKind::Expired, "agent invite expired"));
    }

    let plaintext = mesh_core::generate_token();
    let mut record = agent::get(doc, &invite.agent_id).unwrap_or(AgentRecord {
        name: None,
        gateway: None,
        kind: AgentKind::External,
        registered_at: now,
        registered_by: invite.created_by.clone(),
        auth: None,
    });
    record.auth = Some(AgentAuth {
        token_hash: AgentAuth::hash_token(&plaintext),
        issued_at: now,
        rotated_at: None,
        token_hint: AgentAuth::hint(&plaintext),
        accepted_at: Some(now),
        accepted_by_node: accepted_by_node.clone(),
        accepted_by_agent: accepted_by_agent.clone(),
    });
    agent::put(doc, &invite.agent_id, &record);

    invite.used_at = Some(now);
    invite.used_by_node = accepted_by_node;
    invite.used_by_agent = accepted_by_agent;
    node::put_agent_invite(doc, token, &invite);

    Ok(ToolResponse::ok(serde_json::json!({ "agentId": invite.agent_id, "token": plaintext })))
}

pub fn list_agents(doc: &Doc) -> ToolResponse {
    let agents = agent::load(doc);
    ToolResponse::ok(serde_json::json!({ "agents": agents }))
}

/// Admin-only: invite token hashes are never exposed, but listing which
/// invites exist and their consumption state is.
pub fn list_agent_invites(caller: &Caller, doc: &Doc) -> ToolResponse {
    if !caller.is_admin {
        return ToolError::admin_required("list_agent_invites requires an admin capability").into();
    }
    let invites: Vec<serde_json::Value> = node::load_agent_invites(doc)
        .into_iter()
        .map(|(token, inv)| {
            serde_json::json!({
                "token": token,
                "agentId": inv.agent_id,
                "createdAt": inv.created_at,
                "expiresAt": inv.expires_at,
                "usedAt": inv.used_at,
                "revokedAt": inv.revoked_at,
            })
        })
        .collect();
    ToolResponse::ok(serde_json::json!({ "invites": invites }))
}

pub fn advertise_skills(doc: &Doc, caller: &Caller, skills: Vec<String>, now: u64) -> ToolResponse {
    let mut ctx = context::get(doc, &caller.agent_id);
    ctx.advertise_skills(skills, now);
    context::put(doc, &caller.agent_id, &ctx);
    ToolResponse::ok_value(&ctx)
}

/// Publish a pending task whose only receiver constraint is the required
/// skill — a thin front door over the normal skills-lookup assignment path.
pub fn create_skill_task(
    doc: &Doc,
    caller: &Caller,
    title: String,
    description: String,
    skill: String,
    now: u64,
) -> ToolResponse {
    match create_skill_task_inner(doc, caller, title, description, skill, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn create_skill_task_inner(
    doc: &Doc,
    caller: &Caller,
    title: String,
    description: String,
    skill: String,
    now: u64,
) -> Result<ToolResponse, ToolError> {
    use mesh_core::schema::{check_len, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
    check_len("title", &title, MAX_TITLE_LEN)?;
    check_len("description", &description, MAX_DESCRIPTION_LEN)?;

    let t = Task {
        id: TaskId::new().to_string(),
        title,
        description,
        status: TaskStatus::Pending,
        created_by_agent: caller.agent_id.clone(),
        created_by_node: caller.node_id.clone(),
        created_at: now,
        assigned_to_agent: None,
        assigned_to_agents: vec![],
        requires: vec![skill.clone()],
        skill_required: Some(skill),
        intent: Some("skill-advertised".into()),
        metadata: None,
        claimed_by_agent: None,
        claimed_by_node: None,
        claimed_at: None,
        completed_at: None,
        result: None,
        context: None,
        updated_at: None,
        updates: vec![],
        delivery: Default::default(),
    };
    task::put(doc, &t);
    Ok(ToolResponse::ok_value(&t))
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
