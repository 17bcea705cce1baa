// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flat coordination namespace: cluster-wide tunables plus per-node
//! preferences, stored as individual keys in the `"coordination"` collection
//! rather than one monolithic record so concurrent writers only conflict on
//! the keys they actually touch.

use serde::{Deserialize, Serialize};

use crate::crdt::Doc;

/// Collection the flat coordination keys live in.
pub const COLLECTION: &str = "coordination";

/// Key holding the name of the agent currently elected coordinator.
pub const KEY_COORDINATOR: &str = "coordinator";
pub const KEY_SWEEP_EVERY_SECONDS: &str = "sweepEverySeconds";
pub const KEY_RETENTION_CLOSED_TASK_SECONDS: &str = "retentionClosedTaskSeconds";
pub const KEY_RETENTION_PRUNE_EVERY_SECONDS: &str = "retentionPruneEverySeconds";
pub const KEY_DELEGATION_POLICY_MARKDOWN: &str = "delegationPolicyMarkdown";
pub const KEY_DELEGATION_POLICY_VERSION: &str = "delegationPolicyVersion";
pub const KEY_DELEGATION_POLICY_UPDATED_AT: &str = "delegationPolicyUpdatedAt";
pub const KEY_DELEGATION_POLICY_UPDATED_BY: &str = "delegationPolicyUpdatedBy";
pub const KEY_SLA_SWEEP_EVERY_SECONDS: &str = "slaSweepEverySeconds";
pub const KEY_SLA_SWEEP_BUDGET: &str = "slaSweepBudget";

/// Prefix for per-node preference keys: `pref:<nodeId>`.
pub const PREF_KEY_PREFIX: &str = "pref:";

pub fn pref_key(node_id: &str) -> String {
    format!("{PREF_KEY_PREFIX}{node_id}")
}

pub const DEFAULT_SWEEP_EVERY_SECONDS: u64 = 300;
pub const DEFAULT_RETENTION_CLOSED_TASK_SECONDS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_RETENTION_PRUNE_EVERY_SECONDS: u64 = 24 * 60 * 60;
pub const DEFAULT_SLA_SWEEP_EVERY_SECONDS: u64 = 300;
pub const DEFAULT_SLA_SWEEP_BUDGET: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default = "default_closed_task_seconds")]
    pub closed_task_seconds: u64,
    #[serde(default = "default_prune_every_seconds")]
    pub prune_every_seconds: u64,
}

fn default_closed_task_seconds() -> u64 {
    DEFAULT_RETENTION_CLOSED_TASK_SECONDS
}

fn default_prune_every_seconds() -> u64 {
    DEFAULT_RETENTION_PRUNE_EVERY_SECONDS
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            closed_task_seconds: DEFAULT_RETENTION_CLOSED_TASK_SECONDS,
            prune_every_seconds: DEFAULT_RETENTION_PRUNE_EVERY_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationPolicy {
    pub markdown: String,
    pub version: u64,
    pub updated_at: u64,
    pub updated_by: String,
    #[serde(default)]
    pub acknowledged_by: Vec<DelegationPolicyAck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationPolicyAck {
    pub agent: String,
    pub version: u64,
    pub at: u64,
}

impl DelegationPolicy {
    pub fn is_acknowledged_at_current_version(&self, agent: &str) -> bool {
        self.acknowledged_by.iter().any(|a| a.agent == agent && a.version == self.version)
    }

    pub fn acknowledge(&mut self, agent: impl Into<String>, at: u64) {
        let agent = agent.into();
        self.acknowledged_by.retain(|a| a.agent != agent);
        self.acknowledged_by.push(DelegationPolicyAck { agent, version: self.version, at });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaSweepConfig {
    #[serde(default = "default_sla_sweep_every_seconds")]
    pub every_seconds: u64,
    #[serde(default = "default_sla_sweep_budget")]
    pub budget: u32,
}

fn default_sla_sweep_every_seconds() -> u64 {
    DEFAULT_SLA_SWEEP_EVERY_SECONDS
}

fn default_sla_sweep_budget() -> u32 {
    DEFAULT_SLA_SWEEP_BUDGET
}

impl Default for SlaSweepConfig {
    fn default() -> Self {
        Self { every_seconds: DEFAULT_SLA_SWEEP_EVERY_SECONDS, budget: DEFAULT_SLA_SWEEP_BUDGET }
    }
}

pub fn get_str(doc: &Doc, key: &str) -> Option<String> {
    doc.get(COLLECTION, key).and_then(|v| v.as_str().map(str::to_string))
}

pub fn get_u64(doc: &Doc, key: &str) -> Option<u64> {
    doc.get(COLLECTION, key).and_then(|v| v.as_u64())
}

pub fn get_u32(doc: &Doc, key: &str) -> Option<u32> {
    get_u64(doc, key).map(|v| v as u32)
}

pub fn set_str(doc: &Doc, key: &str, value: impl Into<String>) {
    doc.set(COLLECTION, key, serde_json::Value::String(value.into()));
}

pub fn set_u64(doc: &Doc, key: &str, value: u64) {
    doc.set(COLLECTION, key, serde_json::json!(value));
}

pub fn get_retention_policy(doc: &Doc) -> RetentionPolicy {
    RetentionPolicy {
        closed_task_seconds: get_u64(doc, KEY_RETENTION_CLOSED_TASK_SECONDS)
            .unwrap_or(DEFAULT_RETENTION_CLOSED_TASK_SECONDS),
        prune_every_seconds: get_u64(doc, KEY_RETENTION_PRUNE_EVERY_SECONDS)
            .unwrap_or(DEFAULT_RETENTION_PRUNE_EVERY_SECONDS),
    }
}

pub fn set_retention_policy(doc: &Doc, policy: &RetentionPolicy) {
    set_u64(doc, KEY_RETENTION_CLOSED_TASK_SECONDS, policy.closed_task_seconds);
    set_u64(doc, KEY_RETENTION_PRUNE_EVERY_SECONDS, policy.prune_every_seconds);
}

pub fn get_sla_sweep_config(doc: &Doc) -> SlaSweepConfig {
    SlaSweepConfig {
        every_seconds: get_u64(doc, KEY_SLA_SWEEP_EVERY_SECONDS).unwrap_or(DEFAULT_SLA_SWEEP_EVERY_SECONDS),
        budget: get_u32(doc, KEY_SLA_SWEEP_BUDGET).unwrap_or(DEFAULT_SLA_SWEEP_BUDGET),
    }
}

pub fn get_delegation_policy(doc: &Doc) -> Option<DelegationPolicy> {
    let markdown = get_str(doc, KEY_DELEGATION_POLICY_MARKDOWN)?;
    let version = get_u64(doc, KEY_DELEGATION_POLICY_VERSION).unwrap_or(1);
    let updated_at = get_u64(doc, KEY_DELEGATION_POLICY_UPDATED_AT).unwrap_or(0);
    let updated_by = get_str(doc, KEY_DELEGATION_POLICY_UPDATED_BY).unwrap_or_default();
    let acknowledged_by = doc
        .get(COLLECTION, "delegationPolicyAcks")
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    Some(DelegationPolicy { markdown, version, updated_at, updated_by, acknowledged_by })
}

pub fn set_delegation_policy(doc: &Doc, policy: &DelegationPolicy) {
    set_str(doc, KEY_DELEGATION_POLICY_MARKDOWN, policy.markdown.clone());
    set_u64(doc, KEY_DELEGATION_POLICY_VERSION, policy.version);
    set_u64(doc, KEY_DELEGATION_POLICY_UPDATED_AT, policy.updated_at);
    set_str(doc, KEY_DELEGATION_POLICY_UPDATED_BY, policy.updated_by.clone());
    doc.set(COLLECTION, "delegationPolicyAcks", serde_json::json!(policy.acknowledged_by));
}

#[cfg(test)]
#[path = "coordination_tests.rs"]
mod tests;
