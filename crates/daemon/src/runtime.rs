// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host plugin boundary: everything past "deliver this message/task to
//! an agent" is the embedding host's responsibility (process spawning,
//! model calls, `before_agent_start` context injection, reply buffering).
//! This crate only needs something that implements [`HostRuntime`]; the
//! logging implementation here stands in for a real host until one is
//! wired in, and is useful on its own as an audit/dry-run mode.

use async_trait::async_trait;
use mesh_core::{Message, Task};
use mesh_engine::HostRuntime;
use tracing::info;

pub struct LoggingHostRuntime;

#[async_trait]
impl HostRuntime for LoggingHostRuntime {
    async fn deliver_message(&self, receiver: &str, message: &Message) -> Result<Option<String>, String> {
        info!(receiver, message_id = %message.id, from = %message.from_agent, "would deliver message to host runtime");
        Ok(None)
    }

    async fn deliver_task(&self, receiver: &str, task: &Task) -> Result<Option<String>, String> {
        info!(receiver, task_id = %task.id, title = %task.title, "would deliver task to host runtime");
        Ok(None)
    }
}
