// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing for the sync protocol: JSON frames over a WebSocket text
//! stream. There is no external CRDT library in this dependency graph to be
//! byte-compatible with (see the design notes), so the peer on both ends of
//! every connection is this same crate and the frame shape is ours to
//! define: one full-state snapshot exchanged at connect time, followed by
//! an append-only stream of op batches.

use mesh_core::DocUpdate;
use serde::{Deserialize, Serialize};

/// The logical room every connection joins; carried in the hello frame so a
/// future multi-room deployment can reject a mismatched peer early.
pub const ROOM: &str = "ansible-shared";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// First frame sent by the connecting side, identifying itself.
    Hello { node_id: String, room: String },
    /// Sent by the accepting side once `Hello` is accepted: the current
    /// compacted document state, to be merged (not replace) into the
    /// receiver's local document.
    Snapshot { doc: Vec<u8> },
    /// An incremental update batch, relayed in both directions after the
    /// initial snapshot exchange.
    Update { ops: DocUpdate },
    /// Keepalive; also used to detect half-open connections faster than TCP
    /// timeouts would.
    Ping,
    Pong,
    /// Sent by the accepting side when `Hello` is rejected (bad room,
    /// unauthorized node, expired ticket).
    Rejected { reason: String },
}

impl Frame {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
