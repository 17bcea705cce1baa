// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile loop: the single code path that handles live delivery,
//! reconnect catch-up, and retries alike. Every `tasks`/`messages` mutation
//! and every sync event funnels into the same `reconcile_once` pass so none
//! of those cases gets bespoke dispatch logic that can drift from the rest.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mesh_core::{agent, context, message, task, BackoffPolicy, Clock, Doc, DeliveryRecord, Message, NodeId, Task};
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, warn};

use crate::reply::is_suppressed_error_phrase;

/// Host agent runtime, injected by the daemon: actually turning a delivered
/// message or task into model/tool activity is outside this crate's
/// responsibility, same separation [`mesh_transport::AuthGate`] draws
/// between the transport and the daemon's admission logic.
#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Invoke the host runtime for a delivered message. `Ok(Some(reply))`
    /// publishes `reply` as a new message back to the sender.
    async fn deliver_message(&self, receiver: &str, message: &Message) -> Result<Option<String>, String>;

    /// Invoke the host runtime for a delivered task.
    async fn deliver_task(&self, receiver: &str, task: &Task) -> Result<Option<String>, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Message,
    Task,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Message => "msg",
            Kind::Task => "task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RetryKey {
    kind: &'static str,
    id: String,
    receiver: String,
}

impl RetryKey {
    fn new(kind: Kind, id: &str, receiver: &str) -> Self {
        Self { kind: kind.as_str(), id: id.to_string(), receiver: receiver.to_string() }
    }
}

struct DispatchItem {
    kind: Kind,
    id: String,
    receiver: String,
    order: (u64, String),
}

struct DispatcherState {
    in_flight: HashSet<RetryKey>,
    scheduled: HashSet<RetryKey>,
}

/// Observes `messages` and `tasks`, maintaining an in-memory delivery
/// schedule on top of the CRDT-backed ledger each record already carries.
pub struct Dispatcher<R: HostRuntime, C: Clock> {
    doc: Arc<Doc>,
    node_id: NodeId,
    runtime: Arc<R>,
    clock: C,
    state: Mutex<DispatcherState>,
    notify: Arc<Notify>,
}

impl<R: HostRuntime + 'static, C: Clock + 'static> Dispatcher<R, C> {
    pub fn new(doc: Arc<Doc>, node_id: NodeId, runtime: Arc<R>, clock: C) -> Arc<Self> {
        Arc::new(Self {
            doc,
            node_id,
            runtime,
            clock,
            state: Mutex::new(DispatcherState { in_flight: HashSet::new(), scheduled: HashSet::new() }),
            notify: Arc::new(Notify::new()),
        })
    }

    /// Enqueue a reconcile pass. Safe to call from any mutation path; runs
    /// coalesce naturally because the loop drains pending notifications
    /// before starting the next pass.
    pub fn kick(self: &Arc<Self>) {
        self.notify.notify_one();
    }

    /// Drives reconcile off doc updates and scheduled retries until
    /// `shutdown` fires.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut updates = self.doc.on_update();
        self.kick();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => return,
                _ = self.notify.notified() => {}
                update = updates.recv() => {
                    if matches!(update, Err(broadcast::error::RecvError::Closed)) {
                        return;
                    }
                }
            }
            // A burst of writes (a full sync, a batch of claims) should
            // collapse into a single pass rather than one per op.
            while updates.try_recv().is_ok() {}
            self.reconcile_once().await;
        }
    }

    async fn reconcile_once(self: &Arc<Self>) {
        let items = self.select_candidates();
        for item in items {
            self.dispatch_one(item).await;
        }
    }

    /// Enumerate this node's own id plus every `internal` agent whose
    /// gateway is this node — the receivers a live reconcile pass may
    /// deliver to locally.
    fn local_receivers(&self, agents: &HashMap<String, mesh_core::AgentRecord>) -> Vec<String> {
        let mut out = vec![self.node_id.as_str().to_string()];
        for id in agent::internal_agents_on(agents, &self.node_id) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    fn select_candidates(&self) -> Vec<DispatchItem> {
        let agents = agent::load(&self.doc);
        let receivers = self.local_receivers(&agents);
        let contexts = context::load(&self.doc);

        let state = self.state.lock();
        let mut items = Vec::new();

        for (id, m) in message::load(&self.doc) {
            for r in &receivers {
                if m.from_agent == *r {
                    continue;
                }
                if !m.is_addressed_to(r) {
                    continue;
                }
                if m.is_read_by(r) || already_delivered(&m.delivery, r) {
                    continue;
                }
                if attempts_exhausted(&m.delivery, r) {
                    continue;
                }
                let key = RetryKey::new(Kind::Message, &id, r);
                if state.in_flight.contains(&key) || state.scheduled.contains(&key) {
                    continue;
                }
                items.push(DispatchItem {
                    kind: Kind::Message,
                    id: id.clone(),
                    receiver: r.clone(),
                    order: (m.created_at, id.clone()),
                });
            }
        }

        for (id, t) in task::load(&self.doc) {
            if !t.status.is_open_for_dispatch() {
                continue;
            }
            if !t.has_explicit_assignees() {
                continue;
            }
            for r in &receivers {
                if !t.assignees().contains(&r.as_str()) {
                    continue;
                }
                if t.created_by_agent == *r {
                    continue;
                }
                if let Some(claimant) = &t.claimed_by_agent {
                    if claimant != r {
                        continue;
                    }
                }
                if let Some(skill) = &t.skill_required {
                    let has_skill = contexts.get(r).is_some_and(|c| c.has_skill(skill));
                    if !has_skill {
                        continue;
                    }
                }
                if attempts_exhausted(&t.delivery, r) {
                    continue;
                }
                let key = RetryKey::new(Kind::Task, &id, r);
                if state.in_flight.contains(&key) || state.scheduled.contains(&key) {
                    continue;
                }
                items.push(DispatchItem {
                    kind: Kind::Task,
                    id: id.clone(),
                    receiver: r.clone(),
                    order: (t.created_at, id.clone()),
                });
            }
        }
        drop(state);

        // One total order per cycle: messages by (timestamp,id), tasks by
        // (createdAt,id) — both map onto the same (u64,String) tuple.
        items.sort_by(|a, b| a.order.cmp(&b.order));
        items
    }

    async fn dispatch_one(self: &Arc<Self>, item: DispatchItem) {
        let key = RetryKey::new(item.kind, &item.id, &item.receiver);
        {
            let mut state = self.state.lock();
            state.in_flight.insert(key.clone());
        }

        let now = self.clock.epoch_ms() / 1000;
        let outcome = match item.kind {
            Kind::Message => self.dispatch_message(&item.id, &item.receiver, now).await,
            Kind::Task => self.dispatch_task(&item.id, &item.receiver, now).await,
        };

        {
            let mut state = self.state.lock();
            state.in_flight.remove(&key);
        }

        if let Err(attempts) = outcome {
            self.schedule_retry(key, attempts);
        }
    }

    async fn dispatch_message(self: &Arc<Self>, id: &str, receiver: &str, now: u64) -> Result<(), u32> {
        let Some(mut m) = message::get(&self.doc, id) else { return Ok(()) };
        let attempts = m.delivery.get(receiver).map(|d| d.attempts).unwrap_or(0) + 1;
        m.delivery.insert(receiver.to_string(), DeliveryRecord::attempted(now, self.node_id.to_string(), attempts));
        message::put(&self.doc, &m);

        match self.runtime.deliver_message(receiver, &m).await {
            Ok(reply) => {
                let mut m = message::get(&self.doc, id).unwrap_or(m);
                m.delivery
                    .entry(receiver.to_string())
                    .or_insert_with(|| DeliveryRecord::attempted(now, self.node_id.to_string(), attempts))
                    .mark_delivered(now);
                m.mark_read(receiver);
                message::put(&self.doc, &m);
                if let Some(text) = reply {
                    self.publish_reply(receiver, &m.from_agent, text, now);
                }
                Ok(())
            }
            Err(err) => {
                warn!(%id, %receiver, attempt = attempts, error = %err, "message dispatch failed");
                let mut m = message::get(&self.doc, id).unwrap_or(m);
                m.delivery
                    .entry(receiver.to_string())
                    .or_insert_with(|| DeliveryRecord::attempted(now, self.node_id.to_string(), attempts))
                    .mark_failed(now, err);
                message::put(&self.doc, &m);
                Err(attempts)
            }
        }
    }

    async fn dispatch_task(self: &Arc<Self>, id: &str, receiver: &str, now: u64) -> Result<(), u32> {
        let Some(mut t) = task::get(&self.doc, id) else { return Ok(()) };
        let attempts = t.delivery.get(receiver).map(|d| d.attempts).unwrap_or(0) + 1;
        t.delivery.insert(receiver.to_string(), DeliveryRecord::attempted(now, self.node_id.to_string(), attempts));
        task::put(&self.doc, &t);

        match self.runtime.deliver_task(receiver, &t).await {
            Ok(reply) => {
                let mut t = task::get(&self.doc, id).unwrap_or(t);
                t.delivery
                    .entry(receiver.to_string())
                    .or_insert_with(|| DeliveryRecord::attempted(now, self.node_id.to_string(), attempts))
                    .mark_delivered(now);
                task::put(&self.doc, &t);
                if let Some(text) = reply {
                    self.publish_reply(receiver, &t.created_by_agent, text, now);
                }
                Ok(())
            }
            Err(err) => {
                warn!(%id, %receiver, attempt = attempts, error = %err, "task dispatch failed");
                let mut t = task::get(&self.doc, id).unwrap_or(t);
                t.delivery
                    .entry(receiver.to_string())
                    .or_insert_with(|| DeliveryRecord::attempted(now, self.node_id.to_string(), attempts))
                    .mark_failed(now, err);
                task::put(&self.doc, &t);
                Err(attempts)
            }
        }
    }

    /// Write the host runtime's final reply as a new message back to the
    /// original sender, suppressing replies that look like surfaced
    /// model/transport error phrases rather than a real response.
    fn publish_reply(self: &Arc<Self>, receiver: &str, to: &str, text: String, now: u64) {
        if is_suppressed_error_phrase(&text) {
            debug!(%receiver, %to, "suppressing reply that reads as a transport/model error");
            return;
        }
        let reply = Message {
            id: mesh_core::MessageId::new().to_string(),
            from_agent: receiver.to_string(),
            to_agents: vec![to.to_string()],
            content: text,
            created_at: now,
            read_by_agents: std::iter::once(receiver.to_string()).collect(),
            delivery: HashMap::new(),
        };
        message::put(&self.doc, &reply);
    }

    /// Schedule another reconcile pass after the jittered backoff delay for
    /// this key's attempt count. The timer re-kicks the whole loop rather
    /// than retrying this one item directly — ordering is re-evaluated
    /// under current state every time.
    fn schedule_retry(self: &Arc<Self>, key: RetryKey, attempts: u32) {
        {
            let mut state = self.state.lock();
            state.scheduled.insert(key.clone());
        }
        let delay = BackoffPolicy::DISPATCH.delay(attempts, unit_jitter());
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = this.state.lock();
                state.scheduled.remove(&key);
            }
            this.kick();
        });
    }
}

fn already_delivered(delivery: &mesh_core::DeliveryLedger, receiver: &str) -> bool {
    delivery.get(receiver).is_some_and(|d| d.is_delivered())
}

fn attempts_exhausted(delivery: &mesh_core::DeliveryLedger, receiver: &str) -> bool {
    delivery.get(receiver).is_some_and(|d| d.attempts_exhausted())
}

fn unit_jitter() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    ((nanos % 2000) as f64 / 1000.0) - 1.0
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
