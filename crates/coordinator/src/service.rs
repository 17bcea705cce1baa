// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties the per-node ambient loops (heartbeat, local message retention,
//! optional lock sweep) and the coordinator-elected sweeps (closed-task
//! retention, SLA breach escalation) into one periodic loop, in the same
//! observe-and-reconcile shape [`mesh_engine::Dispatcher`] uses for dispatch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use mesh_core::coordination;
use mesh_core::pulse::PULSE_INTERVAL_SECS;
use mesh_core::{Clock, Doc, NodeId};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::lock_sweep::{self, LockSweepConfig};
use crate::{heartbeat, message_retention, sla, task_retention};

/// Key this sweep writes its last-run timestamp under, so a coordinator
/// flap between nodes doesn't cause a burst of duplicate sweeps.
const KEY_TASK_RETENTION_LAST_AT: &str = "taskRetentionLastAt";
const KEY_SLA_SWEEP_LAST_AT: &str = "slaSweepLastAt";

/// How often the service wakes to check whether any sweep is due. Cheap:
/// every tick is mostly just comparing timestamps.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct CoordinatorConfig {
    pub is_backbone: bool,
    pub fyi_agents: Vec<String>,
    pub lock_sweep: LockSweepConfig,
    pub lock_sweep_dir: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { is_backbone: true, fyi_agents: Vec::new(), lock_sweep: LockSweepConfig::default(), lock_sweep_dir: None }
    }
}

pub struct Coordinator<C: Clock> {
    doc: Arc<Doc>,
    node_id: NodeId,
    clock: C,
    config: CoordinatorConfig,
    last_heartbeat_at: parking_lot::Mutex<Option<u64>>,
    last_message_retention_at: parking_lot::Mutex<Option<u64>>,
    last_lock_sweep_at: parking_lot::Mutex<Option<u64>>,
}

impl<C: Clock + 'static> Coordinator<C> {
    pub fn new(doc: Arc<Doc>, node_id: NodeId, clock: C, config: CoordinatorConfig) -> Arc<Self> {
        Arc::new(Self {
            doc,
            node_id,
            clock,
            config,
            last_heartbeat_at: parking_lot::Mutex::new(None),
            last_message_retention_at: parking_lot::Mutex::new(None),
            last_lock_sweep_at: parking_lot::Mutex::new(None),
        })
    }

    fn now_secs(&self) -> u64 {
        self.clock.epoch_ms() / 1000
    }

    fn is_elected(&self) -> bool {
        self.config.is_backbone && coordination::get_str(&self.doc, coordination::KEY_COORDINATOR).as_deref() == Some(self.node_id.as_str())
    }

    /// Run every ambient and (if elected) coordinator-gated sweep once.
    /// Exposed separately from [`Self::run`] so callers can drive it from
    /// their own test harness without spinning up the loop.
    pub fn tick_once(&self) {
        let now = self.now_secs();

        let mut last_heartbeat = self.last_heartbeat_at.lock();
        let heartbeat_due = match *last_heartbeat {
            Some(last) => now.saturating_sub(last) >= PULSE_INTERVAL_SECS,
            None => true,
        };
        if heartbeat_due {
            heartbeat::beat(&self.doc, self.node_id.as_str(), now);
            *last_heartbeat = Some(now);
        }
        drop(last_heartbeat);

        let mut last_retention = self.last_message_retention_at.lock();
        let due = match *last_retention {
            Some(last) => now.saturating_sub(last) >= message_retention::SWEEP_EVERY_SECS,
            None => true,
        };
        if due {
            let removed = message_retention::sweep(&self.doc, now);
            if removed > 0 {
                debug!(removed, "local message retention sweep");
            }
            *last_retention = Some(now);
        }
        drop(last_retention);

        if let Some(dir) = &self.config.lock_sweep_dir {
            let mut last_lock = self.last_lock_sweep_at.lock();
            let due = match *last_lock {
                Some(last) => now.saturating_sub(last) >= self.config.lock_sweep.every_seconds,
                None => true,
            };
            if due {
                let removed = lock_sweep::sweep(dir, &self.config.lock_sweep, SystemTime::now());
                if removed > 0 {
                    info!(removed, "stale session lock sweep");
                }
                *last_lock = Some(now);
            }
        }

        if !self.is_elected() {
            return;
        }

        let policy = coordination::get_retention_policy(&self.doc);
        let last_retention = coordination::get_u64(&self.doc, KEY_TASK_RETENTION_LAST_AT);
        if task_retention::is_due(&policy, last_retention, now) {
            let removed = task_retention::sweep(&self.doc, &policy, now);
            if removed > 0 {
                info!(removed, "closed-task retention sweep");
            }
            coordination::set_u64(&self.doc, KEY_TASK_RETENTION_LAST_AT, now);
        }

        let sla_config = coordination::get_sla_sweep_config(&self.doc);
        let last_sla = coordination::get_u64(&self.doc, KEY_SLA_SWEEP_LAST_AT);
        let sla_due = match last_sla {
            Some(last) => now.saturating_sub(last) >= sla_config.every_seconds,
            None => true,
        };
        if sla_due {
            let breaches = sla::sweep(&self.doc, &sla_config, &self.config.fyi_agents, now);
            if !breaches.is_empty() {
                info!(count = breaches.len(), "SLA breach sweep escalated tasks");
            }
            coordination::set_u64(&self.doc, KEY_SLA_SWEEP_LAST_AT, now);
        }
    }

    /// Drives [`Self::tick_once`] on [`TICK_INTERVAL`] until `shutdown`
    /// fires, then marks this node's pulse offline before returning.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => self.tick_once(),
            }
        }
        let now = self.now_secs();
        heartbeat::mark_offline(&self.doc, self.node_id.as_str(), now);
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
