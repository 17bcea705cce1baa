// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SLA breach sweep: scans `task.metadata.ansible.sla` for due-by
//! timestamps the task has blown past, records the escalation on the task,
//! and notifies whoever's watching it — up to a per-cycle message budget.

use mesh_core::coordination::SlaSweepConfig;
use mesh_core::task::{SlaBreachKind, TaskSla};
use mesh_core::{message, task, Doc, Message, MessageId, Task};
use tracing::error;

/// One escalation emitted by a sweep pass, returned for observability/tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub task_id: String,
    pub kind: SlaBreachKind,
    pub due_at: u64,
}

fn due_breach(sla: &TaskSla, now: u64) -> Option<(SlaBreachKind, u64)> {
    if let Some(due) = sla.complete_by_at {
        if sla.escalations.complete_at.is_none() && now >= due {
            return Some((SlaBreachKind::Complete, due));
        }
    }
    if let Some(due) = sla.progress_by_at {
        if sla.escalations.progress_at.is_none() && now >= due {
            return Some((SlaBreachKind::Progress, due));
        }
    }
    if let Some(due) = sla.accept_by_at {
        if sla.escalations.accept_at.is_none() && now >= due {
            return Some((SlaBreachKind::Accept, due));
        }
    }
    None
}

fn recipients(t: &Task, fyi_agents: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    if !t.created_by_agent.is_empty() {
        out.push(t.created_by_agent.clone());
    }
    if let Some(a) = &t.claimed_by_agent {
        if !out.contains(a) {
            out.push(a.clone());
        }
    }
    if out.is_empty() {
        out.extend(fyi_agents.iter().cloned());
    }
    out
}

/// Escalate up to `config.budget` breached tasks, mutating each task's
/// `escalations` field and emitting one notification message per recipient.
/// Returns every breach actually escalated this pass.
pub fn sweep(doc: &Doc, config: &SlaSweepConfig, fyi_agents: &[String], now: u64) -> Vec<Breach> {
    let mut escalated = Vec::new();
    let mut tasks: Vec<Task> = task::load(doc).into_values().collect();
    tasks.sort_by_key(|t| t.created_at);

    for mut t in tasks {
        if escalated.len() >= config.budget as usize {
            break;
        }
        let Some(mut sla) = t.sla() else { continue };
        let Some((kind, due_at)) = due_breach(&sla, now) else { continue };

        match kind {
            SlaBreachKind::Accept => sla.escalations.accept_at = Some(now),
            SlaBreachKind::Progress => sla.escalations.progress_at = Some(now),
            SlaBreachKind::Complete => sla.escalations.complete_at = Some(now),
        }
        write_sla(&mut t, &sla);
        task::put(doc, &t);

        for to in recipients(&t, fyi_agents) {
            let m = Message {
                id: MessageId::new().to_string(),
                from_agent: "coordinator".to_string(),
                to_agents: vec![to],
                content: format!("task {} breached its {kind} SLA (due {due_at})", t.id),
                created_at: now,
                read_by_agents: Default::default(),
                delivery: Default::default(),
            };
            message::put(doc, &m);
        }

        escalated.push(Breach { task_id: t.id.clone(), kind, due_at });
    }

    escalated
}

/// Write the (possibly mutated) SLA block back onto `t.metadata.ansible.sla`,
/// preserving every other `metadata` key already present.
fn write_sla(t: &mut Task, sla: &TaskSla) {
    let mut root = match t.metadata.take() {
        Some(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    let mut ansible = match root.remove("ansible") {
        Some(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    match serde_json::to_value(sla) {
        Ok(v) => {
            ansible.insert("sla".to_string(), v);
        }
        Err(err) => error!(%err, task_id = %t.id, "failed to serialize SLA breach metadata"),
    }
    root.insert("ansible".to_string(), serde_json::Value::Object(ansible));
    t.metadata = Some(serde_json::Value::Object(root));
}

#[cfg(test)]
#[path = "sla_tests.rs"]
mod tests;
