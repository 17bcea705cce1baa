// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Doc-membership admission: the inner layer of the three concentric
//! admission checks (network reachability and ticket consumption happen
//! before a connection reaches this gate).

use std::sync::Arc;

use mesh_core::agent;
use mesh_core::{Clock, Doc, NodeId};
use mesh_transport::AuthGate;

pub struct AdmissionGate<C: Clock> {
    doc: Arc<Doc>,
    clock: C,
}

impl<C: Clock> AdmissionGate<C> {
    pub fn new(doc: Arc<Doc>, clock: C) -> Self {
        Self { doc, clock }
    }
}

#[async_trait::async_trait]
impl<C: Clock> AuthGate for AdmissionGate<C> {
    async fn check(&self, node_id: &str) -> Option<String> {
        let agents = agent::load(&self.doc);
        let node = NodeId::from_string(node_id);
        let now = self.clock.epoch_ms() / 1000;
        if mesh_core::is_node_authorized(&self.doc, &node, &agents, now) {
            None
        } else {
            Some("node is not a member of this mesh".to_string())
        }
    }
}

/// Admin gate for the destructive tool surface: the caller must present a
/// node with `admin` capability, `from_agent` must match the configured
/// admin agent id, and the agent must either run internally on that node or
/// have presented a token that verifies against its registered credential.
pub fn is_admin_caller(doc: &Doc, caller_node: &NodeId, from_agent: &str, admin_agent_id: &str, presented_token: Option<&str>) -> bool {
    if from_agent != admin_agent_id {
        return false;
    }
    if !mesh_core::node::get_node(doc, caller_node.as_str()).is_some_and(|n| n.is_admin()) {
        return false;
    }
    let Some(record) = agent::get(doc, from_agent) else {
        return false;
    };
    if record.is_internal_on(caller_node) {
        return true;
    }
    match (&record.auth, presented_token) {
        (Some(auth), Some(token)) => auth.verify(token),
        _ => false,
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
