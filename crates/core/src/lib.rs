// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Core domain types for the mesh: CRDT-backed collections, ID schemes,
//! validation, and the agent/node/task/message record shapes shared by the
//! transport, engine, coordinator, and daemon crates.

pub mod macros;

pub mod agent;
pub mod backoff;
pub mod clock;
pub mod context;
pub mod coordination;
pub mod crdt;
pub mod delivery;
pub mod error;
pub mod id;
pub mod ids;
pub mod message;
pub mod node;
pub mod pulse;
pub mod schema;
pub mod task;

pub use agent::{constant_time_eq, generate_token, AgentAuth, AgentKind, AgentRecord};
pub use backoff::BackoffPolicy;
pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{ContextMap, NodeContext};
pub use crdt::{CrdtMap, Doc, DocUpdate, Op, Stamp};
pub use delivery::{DeliveryLedger, DeliveryRecord, DeliveryState};
pub use error::{ErrorKind, ToolError};
pub use id::{seed_from_str, short, IdBuf};
pub use ids::{AgentId, AgentInviteToken, InviteToken, MessageId, NodeId, TaskId, WsTicketId};
pub use message::{Message, MessageMap};
pub use node::{
    consume_ws_ticket, get_agent_invite, get_invite, get_node, get_ws_ticket, is_node_authorized, load_agent_invites, load_nodes,
    mint_ws_ticket_from_invite, put_agent_invite, put_invite, put_node, put_ws_ticket, AgentInvite, Node, NodeMap, PendingInvite, Tier,
    WsTicket,
};
pub use pulse::{Pulse, PulseStatus};
pub use task::{Task, TaskMap, TaskStatus, TaskUpdateEntry};
