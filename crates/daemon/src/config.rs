// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recognized daemon configuration, loaded from a JSON file with environment
//! overrides for the handful of options that make sense to flip without
//! touching disk (state directory, node id override).

use std::path::PathBuf;

use mesh_core::node::Tier;
use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleError;

fn default_tier() -> Tier {
    Tier::Edge
}

fn default_listen_port() -> u16 {
    mesh_transport::DEFAULT_BIND_PORT
}

fn default_true() -> bool {
    true
}

fn default_auth_mode() -> AuthMode {
    AuthMode::Mixed
}

fn default_admin_agent_id() -> String {
    "admin".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    Legacy,
    Mixed,
    TokenRequired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSweepConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_lock_sweep_every_seconds")]
    pub every_seconds: u64,
    #[serde(default = "default_lock_sweep_stale_seconds")]
    pub stale_seconds: u64,
}

fn default_lock_sweep_every_seconds() -> u64 {
    300
}

fn default_lock_sweep_stale_seconds() -> u64 {
    3600
}

impl Default for LockSweepConfig {
    fn default() -> Self {
        Self { enabled: false, every_seconds: default_lock_sweep_every_seconds(), stale_seconds: default_lock_sweep_stale_seconds() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaSweepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sla_sweep_every_seconds")]
    pub every_seconds: u64,
    #[serde(default)]
    pub record_only: bool,
    #[serde(default = "default_sla_sweep_budget")]
    pub max_messages_per_sweep: u32,
    #[serde(default)]
    pub fyi_agents: Vec<String>,
}

fn default_sla_sweep_every_seconds() -> u64 {
    mesh_core::coordination::DEFAULT_SLA_SWEEP_EVERY_SECONDS
}

fn default_sla_sweep_budget() -> u32 {
    mesh_core::coordination::DEFAULT_SLA_SWEEP_BUDGET
}

impl Default for SlaSweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            every_seconds: default_sla_sweep_every_seconds(),
            record_only: false,
            max_messages_per_sweep: default_sla_sweep_budget(),
            fyi_agents: Vec::new(),
        }
    }
}

/// Recognized options, per the external-interfaces configuration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_tier")]
    pub tier: Tier,
    #[serde(default)]
    pub node_id_override: Option<String>,
    #[serde(default)]
    pub listen_host: Option<String>,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default)]
    pub backbone_peers: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub inject_context: bool,
    #[serde(default)]
    pub inject_context_agents: Vec<String>,
    #[serde(default = "default_true")]
    pub dispatch_incoming: bool,
    #[serde(default)]
    pub lock_sweep: LockSweepConfig,
    #[serde(default = "default_auth_mode")]
    pub auth_mode: AuthMode,
    #[serde(default = "default_admin_agent_id")]
    pub admin_agent_id: String,
    #[serde(default)]
    pub sla_sweep: SlaSweepConfig,
    /// Not part of the recognized-options table: where this process keeps
    /// its snapshot, lock file, and (if lock_sweep is enabled) its own
    /// `*.jsonl.lock` files. Resolved separately from the JSON body since
    /// it's usually an environment concern, not a checked-in config value.
    #[serde(skip)]
    pub state_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier: default_tier(),
            node_id_override: None,
            listen_host: None,
            listen_port: default_listen_port(),
            backbone_peers: Vec::new(),
            capabilities: Vec::new(),
            inject_context: false,
            inject_context_agents: Vec::new(),
            dispatch_incoming: true,
            lock_sweep: LockSweepConfig::default(),
            auth_mode: default_auth_mode(),
            admin_agent_id: default_admin_agent_id(),
            sla_sweep: SlaSweepConfig::default(),
            state_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load from `<state_dir>/config.json` if present, falling back to
    /// defaults otherwise; `state_dir` itself always comes from the
    /// environment, never the file.
    pub fn load(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let path = state_dir.join("config.json");
        let mut config = if path.exists() {
            let bytes = std::fs::read(&path)?;
            serde_json::from_slice(&bytes).map_err(LifecycleError::Config)?
        } else {
            Self::default()
        };
        config.state_dir = state_dir;
        Ok(config)
    }

    pub fn is_backbone(&self) -> bool {
        self.tier == Tier::Backbone
    }

    pub fn has_admin_capability(&self) -> bool {
        self.capabilities.iter().any(|c| c == "admin")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
