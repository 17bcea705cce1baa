// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-receiver delivery ledger shared by tasks and messages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum dispatch attempts before a `(item, receiver)` pair is
/// permanently dropped.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Attempted,
    Delivered,
}

crate::simple_display! {
    DeliveryState {
        Attempted => "attempted",
        Delivered => "delivered",
    }
}

/// Record of dispatch attempts for one `(item, receiver)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub state: DeliveryState,
    pub at: u64,
    pub by: String,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DeliveryRecord {
    pub fn attempted(at: u64, by: impl Into<String>, attempts: u32) -> Self {
        Self { state: DeliveryState::Attempted, at, by: by.into(), attempts, last_error: None }
    }

    pub fn mark_delivered(&mut self, at: u64) {
        self.state = DeliveryState::Delivered;
        self.at = at;
        self.last_error = None;
    }

    pub fn mark_failed(&mut self, at: u64, error: impl Into<String>) {
        self.state = DeliveryState::Attempted;
        self.at = at;
        self.last_error = Some(error.into());
    }

    pub fn is_delivered(&self) -> bool {
        self.state == DeliveryState::Delivered
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= MAX_DELIVERY_ATTEMPTS
    }
}

/// Per-receiver delivery ledger, keyed by agent id.
pub type DeliveryLedger = HashMap<String, DeliveryRecord>;

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
