// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination-namespace tools: `update_context`, `get_coordination`,
//! `set_coordination`, `set_retention`, `get_delegation_policy`,
//! `set_delegation_policy`, `ack_delegation_policy`, `status`, and the
//! admin-only `dump_state`/`dump_tasks`/`dump_messages`.

use mesh_core::coordination::{self, DelegationPolicy};
use mesh_core::schema::{check_len, MAX_POLICY_MARKDOWN_LEN};
use mesh_core::{agent, context, message, pulse, task, Doc, ToolError};

use super::{Caller, ToolResponse};

pub fn update_context(
    doc: &Doc,
    caller: &Caller,
    current_focus: Option<String>,
    push_thread: Option<String>,
    push_decision: Option<String>,
    now: u64,
) -> ToolResponse {
    let mut ctx = context::get(doc, &caller.agent_id);
    if let Some(focus) = current_focus {
        ctx.set_focus(focus, now);
    }
    if let Some(thread) = push_thread {
        ctx.push_thread(thread, now);
    }
    if let Some(decision) = push_decision {
        ctx.push_decision(decision, now);
    }
    context::put(doc, &caller.agent_id, &ctx);
    ToolResponse::ok_value(&ctx)
}

pub fn get_coordination(doc: &Doc) -> ToolResponse {
    ToolResponse::ok(serde_json::json!({
        "coordinator": coordination::get_str(doc, coordination::KEY_COORDINATOR),
        "sweepEverySeconds": coordination::get_u64(doc, coordination::KEY_SWEEP_EVERY_SECONDS)
            .unwrap_or(coordination::DEFAULT_SWEEP_EVERY_SECONDS),
        "retention": coordination::get_retention_policy(doc),
        "slaSweep": coordination::get_sla_sweep_config(doc),
    }))
}

/// Admin-only: sets the elected coordinator and/or the base sweep cadence.
pub fn set_coordination(
    doc: &Doc,
    caller: &Caller,
    coordinator: Option<String>,
    sweep_every_seconds: Option<u64>,
) -> ToolResponse {
    if !caller.is_admin {
        return ToolError::admin_required("set_coordination requires an admin capability").into();
    }
    if let Some(c) = coordinator {
        coordination::set_str(doc, coordination::KEY_COORDINATOR, c);
    }
    if let Some(s) = sweep_every_seconds {
        coordination::set_u64(doc, coordination::KEY_SWEEP_EVERY_SECONDS, s);
    }
    get_coordination(doc)
}

/// Admin-only: tunes closed-task retention. Both fields optional;
/// unspecified fields keep their current value.
pub fn set_retention(
    doc: &Doc,
    caller: &Caller,
    closed_task_seconds: Option<u64>,
    prune_every_seconds: Option<u64>,
) -> ToolResponse {
    if !caller.is_admin {
        return ToolError::admin_required("set_retention requires an admin capability").into();
    }
    let mut policy = coordination::get_retention_policy(doc);
    if let Some(v) = closed_task_seconds {
        policy.closed_task_seconds = v;
    }
    if let Some(v) = prune_every_seconds {
        policy.prune_every_seconds = v;
    }
    coordination::set_retention_policy(doc, &policy);
    ToolResponse::ok_value(&policy)
}

pub fn get_delegation_policy(doc: &Doc) -> ToolResponse {
    match coordination::get_delegation_policy(doc) {
        Some(policy) => ToolResponse::ok_value(&policy),
        None => ToolResponse::ok(serde_json::json!(null)),
    }
}

pub fn set_delegation_policy(doc: &Doc, caller: &Caller, markdown: String, now: u64) -> ToolResponse {
    match set_delegation_policy_inner(doc, caller, markdown, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn set_delegation_policy_inner(doc: &Doc, caller: &Caller, markdown: String, now: u64) -> Result<ToolResponse, ToolError> {
    if !caller.is_admin {
        return Err(ToolError::admin_required("set_delegation_policy requires an admin capability"));
    }
    check_len("markdown", &markdown, MAX_POLICY_MARKDOWN_LEN)?;
    let next_version = coordination::get_delegation_policy(doc).map(|p| p.version + 1).unwrap_or(1);
    let policy = DelegationPolicy { markdown, version: next_version, updated_at: now, updated_by: caller.agent_id.clone(), acknowledged_by: vec![] };
    coordination::set_delegation_policy(doc, &policy);
    Ok(ToolResponse::ok_value(&policy))
}

pub fn ack_delegation_policy(doc: &Doc, caller: &Caller, now: u64) -> ToolResponse {
    match ack_delegation_policy_inner(doc, caller, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn ack_delegation_policy_inner(doc: &Doc, caller: &Caller, now: u64) -> Result<ToolResponse, ToolError> {
    let mut policy = coordination::get_delegation_policy(doc).ok_or_else(|| ToolError::not_found("delegation policy"))?;
    policy.acknowledge(caller.agent_id.clone(), now);
    coordination::set_delegation_policy(doc, &policy);
    Ok(ToolResponse::ok(serde_json::json!({
        "version": policy.version,
        "acknowledged": policy.is_acknowledged_at_current_version(&caller.agent_id),
    })))
}

/// Cluster-wide snapshot: agent/task/message counts, this node's pulse, and
/// the current coordination settings. Cheap enough to call frequently.
pub fn status(doc: &Doc, caller: &Caller) -> ToolResponse {
    let agents = agent::load(doc);
    let tasks = task::load(doc);
    let messages = message::load(doc);
    let my_pulse = pulse::get(doc, &caller.agent_id);

    ToolResponse::ok(serde_json::json!({
        "agentCount": agents.len(),
        "taskCount": tasks.len(),
        "openTaskCount": tasks.values().filter(|t| t.status.is_open_for_dispatch()).count(),
        "messageCount": messages.len(),
        "coordinator": coordination::get_str(doc, coordination::KEY_COORDINATOR),
        "pulse": my_pulse,
    }))
}

/// Admin-only full-document dump, for operator debugging. Never exposes
/// hashed agent-token material beyond what's already on the record.
pub fn dump_state(doc: &Doc, caller: &Caller) -> ToolResponse {
    if !caller.is_admin {
        return ToolError::admin_required("dump_state requires an admin capability").into();
    }
    ToolResponse::ok(serde_json::json!({
        "agents": agent::load(doc),
        "tasks": task::load(doc),
        "messages": message::load(doc),
        "context": context::load(doc),
    }))
}

pub fn dump_tasks(doc: &Doc, caller: &Caller) -> ToolResponse {
    if !caller.is_admin {
        return ToolError::admin_required("dump_tasks requires an admin capability").into();
    }
    ToolResponse::ok_value(&task::load(doc))
}

pub fn dump_messages(doc: &Doc, caller: &Caller) -> ToolResponse {
    if !caller.is_admin {
        return ToolError::admin_required("dump_messages requires an admin capability").into();
    }
    ToolResponse::ok_value(&message::load(doc))
}

#[cfg(test)]
#[path = "coordination_tests.rs"]
mod tests;
