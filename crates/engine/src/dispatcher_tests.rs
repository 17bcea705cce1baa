// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mesh_core::{context, task, FakeClock, NodeContext, Task, TaskStatus};
use std::sync::atomic::{AtomicU32, Ordering};

struct FakeRuntime {
    fail_first_n: AtomicU32,
    reply: Option<String>,
}

impl FakeRuntime {
    fn always_succeeds() -> Self {
        Self { fail_first_n: AtomicU32::new(0), reply: None }
    }

    fn succeeds_with_reply(reply: &str) -> Self {
        Self { fail_first_n: AtomicU32::new(0), reply: Some(reply.to_string()) }
    }

    fn fails_first(n: u32) -> Self {
        Self { fail_first_n: AtomicU32::new(n), reply: None }
    }

    fn maybe_fail(&self) -> Result<Option<String>, String> {
        let remaining = self.fail_first_n.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first_n.fetch_sub(1, Ordering::SeqCst);
            return Err("upstream exploded".into());
        }
        Ok(self.reply.clone())
    }
}

#[async_trait]
impl HostRuntime for FakeRuntime {
    async fn deliver_message(&self, _receiver: &str, _message: &Message) -> Result<Option<String>, String> {
        self.maybe_fail()
    }

    async fn deliver_task(&self, _receiver: &str, _task: &Task) -> Result<Option<String>, String> {
        self.maybe_fail()
    }
}

fn dispatcher(runtime: FakeRuntime) -> (Arc<Dispatcher<FakeRuntime, FakeClock>>, Arc<Doc>) {
    let doc = Doc::new(1);
    let d = Dispatcher::new(doc.clone(), NodeId::from_string("node_this"), Arc::new(runtime), FakeClock::new());
    (d, doc)
}

fn sample_message(id: &str, from: &str, to: &str, created_at: u64) -> Message {
    Message {
        id: id.to_string(),
        from_agent: from.to_string(),
        to_agents: vec![to.to_string()],
        content: "hi".to_string(),
        created_at,
        read_by_agents: Default::default(),
        delivery: Default::default(),
    }
}

#[test]
fn select_candidates_orders_messages_by_timestamp_then_id() {
    let (d, doc) = dispatcher(FakeRuntime::always_succeeds());
    message::put(&doc, &sample_message("msg_b", "sender", "node_this", 200));
    message::put(&doc, &sample_message("msg_a", "sender", "node_this", 100));
    message::put(&doc, &sample_message("msg_c", "sender", "node_this", 100));

    let items = d.select_candidates();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["msg_a", "msg_c", "msg_b"]);
}

#[test]
fn select_candidates_skips_sender_and_already_delivered() {
    let (d, doc) = dispatcher(FakeRuntime::always_succeeds());
    message::put(&doc, &sample_message("msg_self", "node_this", "node_this", 1));

    let mut delivered = sample_message("msg_done", "sender", "node_this", 2);
    delivered.delivery.insert(
        "node_this".to_string(),
        mesh_core::DeliveryRecord { state: mesh_core::DeliveryState::Delivered, at: 2, by: "node_this".into(), attempts: 1, last_error: None },
    );
    message::put(&doc, &delivered);

    message::put(&doc, &sample_message("msg_live", "sender", "node_this", 3));

    let items = d.select_candidates();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "msg_live");
}

#[test]
fn select_candidates_requires_explicit_assignee_and_matching_skill() {
    let (d, doc) = dispatcher(FakeRuntime::always_succeeds());

    let mut unassigned = Task {
        id: "tsk_unassigned".into(),
        title: "t".into(),
        description: String::new(),
        status: TaskStatus::Pending,
        created_by_agent: "sender".into(),
        created_by_node: None,
        created_at: 1,
        assigned_to_agent: None,
        assigned_to_agents: vec![],
        requires: vec![],
        skill_required: None,
        intent: None,
        metadata: None,
        claimed_by_agent: None,
        claimed_by_node: None,
        claimed_at: None,
        completed_at: None,
        result: None,
        context: None,
        updated_at: None,
        updates: vec![],
        delivery: Default::default(),
    };
    task::put(&doc, &unassigned);

    unassigned.id = "tsk_needs_skill".into();
    unassigned.assigned_to_agent = Some("node_this".into());
    unassigned.skill_required = Some("rust".into());
    task::put(&doc, &unassigned);

    unassigned.id = "tsk_ready".into();
    unassigned.skill_required = None;
    task::put(&doc, &unassigned);

    let items = d.select_candidates();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["tsk_ready"]);

    let mut ctx = NodeContext::default();
    ctx.advertise_skills(vec!["rust".into()], 1);
    context::put(&doc, "node_this", &ctx);

    let mut ids = d.select_candidates().into_iter().map(|i| i.id).collect::<Vec<_>>();
    ids.sort();
    assert_eq!(ids, vec!["tsk_needs_skill", "tsk_ready"]);
}

#[tokio::test]
async fn dispatch_message_marks_delivered_and_publishes_genuine_reply() {
    let (d, doc) = dispatcher(FakeRuntime::succeeds_with_reply("all done"));
    message::put(&doc, &sample_message("msg_1", "sender", "node_this", 1));

    d.dispatch_message("msg_1", "node_this", 10).await.unwrap();

    let m = message::get(&doc, "msg_1").unwrap();
    assert!(m.delivery.get("node_this").unwrap().is_delivered());
    assert!(m.is_read_by("node_this"));

    let replies: Vec<_> = message::load(&doc).into_values().filter(|m| m.from_agent == "node_this").collect();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, "all done");
    assert_eq!(replies[0].to_agents, vec!["sender".to_string()]);
}

#[tokio::test]
async fn dispatch_message_suppresses_error_phrase_reply() {
    let (d, doc) = dispatcher(FakeRuntime::succeeds_with_reply("HTTP 503: rate limit exceeded upstream"));
    message::put(&doc, &sample_message("msg_1", "sender", "node_this", 1));

    d.dispatch_message("msg_1", "node_this", 10).await.unwrap();

    let replies: Vec<_> = message::load(&doc).into_values().filter(|m| m.from_agent == "node_this").collect();
    assert!(replies.is_empty());
}

#[tokio::test]
async fn dispatch_message_failure_increments_attempts_and_is_retried_by_caller() {
    let (d, doc) = dispatcher(FakeRuntime::fails_first(1));
    message::put(&doc, &sample_message("msg_1", "sender", "node_this", 1));

    let first = d.dispatch_message("msg_1", "node_this", 10).await;
    assert_eq!(first, Err(1));
    let m = message::get(&doc, "msg_1").unwrap();
    let record = m.delivery.get("node_this").unwrap();
    assert_eq!(record.attempts, 1);
    assert!(!record.is_delivered());
    assert!(record.last_error.is_some());

    let second = d.dispatch_message("msg_1", "node_this", 20).await;
    assert_eq!(second, Ok(()));
    let m = message::get(&doc, "msg_1").unwrap();
    assert!(m.delivery.get("node_this").unwrap().is_delivered());
    assert_eq!(m.delivery.get("node_this").unwrap().attempts, 2);
}
