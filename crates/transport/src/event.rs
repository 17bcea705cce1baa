// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observable events emitted by a client connection, consumed by the
//! daemon to drive the doc-ready latch and logging.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

mesh_core::simple_display! {
    ConnectionStatus {
        Connecting => "connecting",
        Connected => "connected",
        Disconnected => "disconnected",
    }
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    Status(ConnectionStatus),
    /// `true` once the initial snapshot merge has completed for this
    /// connection; `false` is emitted on disconnect.
    Sync(bool),
    ConnectionError(String),
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::Status(s) => write!(f, "status({s})"),
            TransportEvent::Sync(b) => write!(f, "sync({b})"),
            TransportEvent::ConnectionError(e) => write!(f, "connection-error({e})"),
        }
    }
}
