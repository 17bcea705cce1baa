// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task state machine: `pending -> claimed -> in_progress -> (completed|failed)`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crdt::Doc;
use crate::delivery::DeliveryLedger;
use crate::ids::NodeId;

/// Maximum entries kept in [`Task::updates`] (newest first).
pub const MAX_UPDATES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Claimed,
    InProgress,
    Completed,
    Failed,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Claimed => "claimed",
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn is_open_for_dispatch(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Claimed | TaskStatus::InProgress)
    }

    /// Whether `self -> next` is a legal state-machine transition.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Claimed)
                | (Claimed, InProgress)
                | (Claimed, Completed)
                | (Claimed, Failed)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }
}

/// One entry in a task's update history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdateEntry {
    pub at: u64,
    pub by_agent: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSla {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_by_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_by_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_by_at: Option<u64>,
    #[serde(default)]
    pub escalations: SlaEscalations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub escalation_outcomes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlaEscalations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaBreachKind {
    Accept,
    Progress,
    Complete,
}

crate::simple_display! {
    SlaBreachKind {
        Accept => "accept",
        Progress => "progress",
        Complete => "complete",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub created_by_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_node: Option<NodeId>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_to_agents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
    #[serde(default)]
    pub updates: Vec<TaskUpdateEntry>,
    #[serde(default)]
    pub delivery: DeliveryLedger,
}

impl Task {
    /// All receivers this task explicitly names (single-assignee field,
    /// multi-assignee field, or both — deduplicated).
    pub fn assignees(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(a) = &self.assigned_to_agent {
            out.push(a.as_str());
        }
        for a in &self.assigned_to_agents {
            if !out.contains(&a.as_str()) {
                out.push(a.as_str());
            }
        }
        out
    }

    pub fn has_explicit_assignees(&self) -> bool {
        self.assigned_to_agent.is_some() || !self.assigned_to_agents.is_empty()
    }

    /// Push a new update entry, trimming to [`MAX_UPDATES`] (newest first).
    pub fn push_update(&mut self, entry: TaskUpdateEntry) {
        self.updates.insert(0, entry);
        self.updates.truncate(MAX_UPDATES);
    }

    /// Close time used by retention: `completed_at ?? updated_at ?? created_at`.
    pub fn close_time(&self) -> u64 {
        self.completed_at.or(self.updated_at).unwrap_or(self.created_at)
    }

    pub fn sla(&self) -> Option<TaskSla> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("ansible"))
            .and_then(|a| a.get("sla"))
            .and_then(|s| serde_json::from_value(s.clone()).ok())
    }
}

pub type TaskMap = HashMap<String, Task>;

/// Collection name the task map is stored under in the shared document.
pub const COLLECTION: &str = "tasks";

/// Load every live task out of the document, keyed by id.
pub fn load(doc: &Doc) -> TaskMap {
    doc.entries(COLLECTION)
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|t| (k, t)))
        .collect()
}

pub fn get(doc: &Doc, id: &str) -> Option<Task> {
    doc.get(COLLECTION, id).and_then(|v| serde_json::from_value(v).ok())
}

/// Replace a task's full record. Concurrent writers racing on the same id
/// resolve by last-writer-wins, per [`crate::crdt`].
pub fn put(doc: &Doc, task: &Task) {
    doc.set_serialized(COLLECTION, &task.id, task);
}

pub fn remove(doc: &Doc, id: &str) {
    doc.delete(COLLECTION, id);
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
