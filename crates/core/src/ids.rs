// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strongly-typed identifiers for every entity in the shared document.

crate::define_id! {
    /// Infrastructure-level identity: one per gateway process.
    pub struct NodeId("node");
}

crate::define_id! {
    /// Coordination-endpoint identity: distinct from [`NodeId`] — an agent
    /// may run on a gateway (internal) or poll from outside it (external).
    pub struct AgentId("agt_");
}

crate::define_id! {
    pub struct TaskId("tsk_");
}

crate::define_id! {
    pub struct MessageId("msg_");
}

crate::define_id! {
    /// Single-use bootstrap credential for node admission.
    pub struct InviteToken("inv_");
}

crate::define_id! {
    /// Pre-upgrade WebSocket gating credential, minted from a consumed invite.
    pub struct WsTicketId("wst_");
}

crate::define_id! {
    /// Single-use bootstrap credential for agent admission.
    pub struct AgentInviteToken("ait_");
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
