// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message tools: `send_message`, `read_messages`, `mark_read`,
//! `delete_messages` (admin-only).

use mesh_core::schema::{check_len, MAX_MESSAGE_LEN};
use mesh_core::{message, Doc, Message, MessageId, ToolError};

use super::{Caller, ToolResponse};

/// Confirmation literal `delete_messages` requires in its `confirm` field.
pub const DELETE_CONFIRMATION: &str = "DELETE_MESSAGES";
pub const DELETE_REASON_MIN_LEN: usize = 15;
pub const DELETE_MAX_COUNT: usize = 200;

pub fn send_message(
    doc: &Doc,
    caller: &Caller,
    content: String,
    to: Vec<String>,
    from_agent_override: Option<String>,
    from_is_authorized_external: bool,
    metadata: Option<serde_json::Value>,
    now: u64,
) -> ToolResponse {
    match send_message_inner(doc, caller, content, to, from_agent_override, from_is_authorized_external, metadata, now) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

#[allow(clippy::too_many_arguments)]
fn send_message_inner(
    doc: &Doc,
    caller: &Caller,
    content: String,
    to: Vec<String>,
    from_agent_override: Option<String>,
    from_is_authorized_external: bool,
    metadata: Option<serde_json::Value>,
    now: u64,
) -> Result<ToolResponse, ToolError> {
    check_len("content", &content, MAX_MESSAGE_LEN)?;

    let from_agent = match from_agent_override {
        Some(agent) if from_is_authorized_external => agent,
        Some(_) => return Err(ToolError::unauthorized("from_agent override requires a matching agent token")),
        None => caller.agent_id.clone(),
    };

    let m = Message {
        id: MessageId::new().to_string(),
        from_agent,
        to_agents: to,
        content,
        created_at: now,
        read_by_agents: Default::default(),
        delivery: Default::default(),
    };
    let _ = &metadata; // metadata is accepted for forward-compatibility, not persisted on the envelope today.
    message::put(doc, &m);
    Ok(ToolResponse::ok_value(&m))
}

pub fn read_messages(doc: &Doc, caller: &Caller, limit: usize) -> ToolResponse {
    let mut mine: Vec<Message> =
        message::load(doc).into_values().filter(|m| m.is_addressed_to(&caller.agent_id)).collect();
    mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    mine.truncate(limit.max(1));
    ToolResponse::ok(serde_json::json!({ "messages": mine }))
}

pub fn mark_read(doc: &Doc, caller: &Caller, message_id: &str) -> ToolResponse {
    match mark_read_inner(doc, caller, message_id) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn mark_read_inner(doc: &Doc, caller: &Caller, message_id: &str) -> Result<ToolResponse, ToolError> {
    let mut m = message::get(doc, message_id).ok_or_else(|| ToolError::not_found(message_id))?;
    m.mark_read(caller.agent_id.clone());
    message::put(doc, &m);
    Ok(ToolResponse::ok_value(&m))
}

pub struct DeleteMessagesInput {
    pub all: bool,
    pub ids: Vec<String>,
    pub reason: String,
    pub confirm: String,
}

/// Admin-only, irreversible: deletes up to [`DELETE_MAX_COUNT`] messages
/// newest-first. Requires the literal confirmation string and a reason of
/// at least [`DELETE_REASON_MIN_LEN`] characters so a fat-fingered call
/// can't wipe the message log.
pub fn delete_messages(doc: &Doc, caller: &Caller, input: DeleteMessagesInput) -> ToolResponse {
    match delete_messages_inner(doc, caller, input) {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

fn delete_messages_inner(doc: &Doc, caller: &Caller, input: DeleteMessagesInput) -> Result<ToolResponse, ToolError> {
    if !caller.is_admin {
        return Err(ToolError::admin_required("delete_messages requires an admin capability"));
    }
    if input.confirm != DELETE_CONFIRMATION {
        return Err(ToolError::invalid(format!("confirm must equal \"{DELETE_CONFIRMATION}\"")));
    }
    if input.reason.len() < DELETE_REASON_MIN_LEN {
        return Err(ToolError::invalid(format!("reason must be at least {DELETE_REASON_MIN_LEN} characters")));
    }

    let mut all_messages: Vec<Message> = message::load(doc).into_values().collect();
    all_messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let targets: Vec<String> = if input.all {
        all_messages.into_iter().take(DELETE_MAX_COUNT).map(|m| m.id).collect()
    } else {
        let wanted: std::collections::HashSet<&str> = input.ids.iter().map(String::as_str).collect();
        all_messages.into_iter().filter(|m| wanted.contains(m.id.as_str())).take(DELETE_MAX_COUNT).map(|m| m.id).collect()
    };

    for id in &targets {
        message::remove(doc, id);
    }

    Ok(ToolResponse::ok(serde_json::json!({ "deleted": targets.len(), "by": caller.agent_id })))
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
