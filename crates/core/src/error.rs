// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for tool/command handlers.
//!
//! Every mutating operation in the tool/command surface returns one of
//! these kinds on failure. They are never retried by the dispatcher —
//! validation and authorization failures are synchronous and final.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, serializable error kind returned to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotInitialized,
    InvalidParams,
    ValidationExceeded,
    Unauthorized,
    AdminRequired,
    AmbiguousId,
    NotFound,
    PreconditionFailed,
    Expired,
    AlreadyUsed,
    NodeMismatch,
    DispatchFailed,
    PersistFailed,
    PeerConnectFailed,
    StateTooLarge,
    PathTraversal,
}

crate::simple_display! {
    ErrorKind {
        NotInitialized => "not_initialized",
        InvalidParams => "invalid_params",
        ValidationExceeded => "validation_exceeded",
        Unauthorized => "unauthorized",
        AdminRequired => "admin_required",
        AmbiguousId => "ambiguous_id",
        NotFound => "not_found",
        PreconditionFailed => "precondition_failed",
        Expired => "expired",
        AlreadyUsed => "already_used",
        NodeMismatch => "node_mismatch",
        DispatchFailed => "dispatch_failed",
        PersistFailed => "persist_failed",
        PeerConnectFailed => "peer_connect_failed",
        StateTooLarge => "state_too_large",
        PathTraversal => "path_traversal",
    }
}

/// Structured error surfaced to a tool/command caller.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
    /// Up to 8 sample keys for `ambiguous_id` responses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), samples: Vec::new() }
    }

    pub fn ambiguous(message: impl Into<String>, samples: Vec<String>) -> Self {
        Self { kind: ErrorKind::AmbiguousId, message: message.into(), samples }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("{what} not found"))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn admin_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AdminRequired, message)
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::PersistFailed, format!("serialization failed: {err}"))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
