// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle tools: `delegate_task`, `claim_task`, `update_task`,
//! `complete_task`, `find_task`.

use std::collections::HashSet;

use mesh_core::schema::{check_len, resolve_key, MAX_CONTEXT_LEN, MAX_DESCRIPTION_LEN, MAX_RESULT_LEN, MAX_TITLE_LEN};
use mesh_core::{agent, context, task, Doc, NodeId, Task, TaskId, TaskStatus, TaskUpdateEntry, ToolError};

use super::{Caller, ToolResponse};

/// Resolve who a new task is assigned to, in priority order: explicit agent
/// id, node-id back-compat (first local internal agent on that node), then
/// a skills lookup over `requires`.
fn resolve_assignees(
    doc: &Doc,
    assigned_to: Option<&str>,
    requires: &[String],
) -> Result<(Option<String>, Vec<String>), ToolError> {
    let agents = agent::load(doc);

    if let Some(target) = assigned_to {
        if agents.contains_key(target) {
            return Ok((Some(target.to_string()), vec![]));
        }
        if target.starts_with(NodeId::PREFIX) {
            let node = NodeId::from_string(target);
            let mut on_node = agent::internal_agents_on(&agents, &node);
            on_node.sort();
            if let Some(first) = on_node.into_iter().next() {
                return Ok((Some(first), vec![]));
            }
            return Err(ToolError::invalid(format!("no internal agent registered on {target}")));
        }
        return Err(ToolError::not_found(target));
    }

    if requires.is_empty() {
        return Ok((None, vec![]));
    }

    let contexts = context::load(doc);
    let mut matches: Option<HashSet<String>> = None;
    for skill in requires {
        let holders: HashSet<String> =
            contexts.iter().filter(|(_, c)| c.has_skill(skill)).map(|(id, _)| id.clone()).collect();
        matches = Some(match matches {
            None => holders,
            Some(acc) => acc.intersection(&holders).cloned().collect(),
        });
    }
    let mut matches: Vec<String> = matches.unwrap_or_default().into_iter().collect();
    matches.sort();

    match matches.len() {
        0 => Err(ToolError::invalid(format!("no agent advertises required skill(s): {}", requires.join(",")))),
        1 => Ok((Some(matches.remove(0)), vec![])),
        _ => Ok((None, matches)),
    }
}

pub struct DelegateTaskInput {
    pub title: String,
    pub description: String,
    pub context: Option<String>,
    pub assigned_to: Option<String>,
    pub requires: Vec<String>,
    pub skill_required: Option<String>,
    pub intent: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

pub fn delegate_task(doc: &Doc, caller: &Caller, now: u64, input: DelegateTaskInput) -> ToolResponse {
    match delegate_task_inner(doc, caller, now, input) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn delegate_task_inner(doc: &Doc, caller: &Caller, now: u64, input: DelegateTaskInput) -> Result<ToolResponse, ToolError> {
    check_len("title", &input.title, MAX_TITLE_LEN)?;
    check_len("description", &input.description, MAX_DESCRIPTION_LEN)?;
    if let Some(c) = &input.context {
        check_len("context", c, MAX_CONTEXT_LEN)?;
    }

    let (assigned_to_agent, assigned_to_agents) =
        resolve_assignees(doc, input.assigned_to.as_deref(), &input.requires)?;

    let t = Task {
        id: TaskId::new().to_string(),
        title: input.title,
        description: input.description,
        status: TaskStatus::Pending,
        created_by_agent: caller.agent_id.clone(),
        created_by_node: caller.node_id.clone(),
        created_at: now,
        assigned_to_agent,
        assigned_to_agents,
        requires: input.requires,
        skill_required: input.skill_required,
        intent: input.intent,
        metadata: input.metadata,
        claimed_by_agent: None,
        claimed_by_node: None,
        claimed_at: None,
        completed_at: None,
        result: None,
        context: input.context,
        updated_at: None,
        updates: vec![],
        delivery: Default::default(),
    };
    task::put(doc, &t);
    Ok(ToolResponse::ok_value(&t))
}

pub fn find_task(doc: &Doc, id_prefix: &str) -> ToolResponse {
    let tasks = task::load(doc);
    match resolve_key(&tasks, id_prefix, |t| t.id.as_str()) {
        Ok(key) => ToolResponse::ok_value(&tasks[key]),
        Err(e) => e.into(),
    }
}

pub fn claim_task(doc: &Doc, caller: &Caller, task_id: &str, now: u64) -> ToolResponse {
    match claim_task_inner(doc, caller, task_id, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn claim_task_inner(doc: &Doc, caller: &Caller, task_id: &str, now: u64) -> Result<ToolResponse, ToolError> {
    let tasks = task::load(doc);
    let key = resolve_key(&tasks, task_id, |t| t.id.as_str())?.to_string();
    let mut t = task::get(doc, &key).ok_or_else(|| ToolError::not_found(task_id))?;

    if t.status != TaskStatus::Pending {
        return Err(ToolError::precondition(format!("task is {}, not pending", t.status)));
    }
    t.status = TaskStatus::Claimed;
    t.claimed_by_agent = Some(caller.agent_id.clone());
    t.claimed_by_node = caller.node_id.clone();
    t.claimed_at = Some(now);
    t.updated_at = Some(now);
    t.push_update(TaskUpdateEntry { at: now, by_agent: caller.agent_id.clone(), status: TaskStatus::Claimed, note: None });
    task::put(doc, &t);
    Ok(ToolResponse::ok_value(&t))
}

pub fn update_task(
    doc: &Doc,
    caller: &Caller,
    task_id: &str,
    status: TaskStatus,
    note: Option<String>,
    result: Option<String>,
    now: u64,
) -> ToolResponse {
    match transition_task(doc, caller, task_id, status, note, result, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

pub fn complete_task(doc: &Doc, caller: &Caller, task_id: &str, result: Option<String>, now: u64) -> ToolResponse {
    match transition_task(doc, caller, task_id, TaskStatus::Completed, None, result, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

/// Shared path for `update_task`/`complete_task`: only the claiming agent
/// may drive a task past `claimed`, and only along a legal transition.
fn transition_task(
    doc: &Doc,
    caller: &Caller,
    task_id: &str,
    status: TaskStatus,
    note: Option<String>,
    result: Option<String>,
    now: u64,
) -> Result<ToolResponse, ToolError> {
    if let Some(r) = &result {
        check_len("result", r, MAX_RESULT_LEN)?;
    }
    let tasks = task::load(doc);
    let key = resolve_key(&tasks, task_id, |t| t.id.as_str())?.to_string();
    let mut t = task::get(doc, &key).ok_or_else(|| ToolError::not_found(task_id))?;

    match &t.claimed_by_agent {
        Some(claimant) if claimant == &caller.agent_id => {}
        Some(_) => return Err(ToolError::precondition("only the claiming agent may transition this task")),
        None => return Err(ToolError::precondition("task has not been claimed yet")),
    }
    if !t.status.can_transition_to(status) {
        return Err(ToolError::precondition(format!("cannot move task from {} to {status}", t.status)));
    }

    t.status = status;
    t.updated_at = Some(now);
    if status == TaskStatus::Completed {
        t.completed_at = Some(now);
    }
    if let Some(r) = result {
        t.result = Some(r);
    }
    t.push_update(TaskUpdateEntry { at: now, by_agent: caller.agent_id.clone(), status, note });
    task::put(doc, &t);
    Ok(ToolResponse::ok_value(&t))
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
