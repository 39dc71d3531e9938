//! Scripted in-memory transport for engine tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_client::{ClientError, MessageRequest, Reply, ThreadOptions, Transport};
use parley_core::{CompletionReport, ThreadEvent};
use serde_json::{Value, json};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateThread,
    Submit { thread_id: String, input: String },
    Poll(String),
    Fetch {
        thread_id: String,
        page_size: u32,
        cursor: Option<String>,
    },
}

#[derive(Default)]
struct Script {
    create: VecDeque<Reply>,
    submit: VecDeque<Reply>,
    polls: VecDeque<Reply>,
    poll_fallback: Option<Reply>,
    poll_delay: Duration,
    pages: VecDeque<Reply>,
    page_delay: Duration,
    calls: Vec<Call>,
}

/// Answers each call from a queue of canned replies. An exhausted queue
/// answers with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().create.push_back(reply);
        self
    }

    pub fn on_submit(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().submit.push_back(reply);
        self
    }

    pub fn on_poll(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().polls.push_back(reply);
        self
    }

    /// Reply used once the poll queue is empty.
    pub fn poll_forever(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().poll_fallback = Some(reply);
        self
    }

    pub fn poll_delay(&self, delay: Duration) -> &Self {
        self.script.lock().unwrap().poll_delay = delay;
        self
    }

    pub fn on_fetch(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().pages.push_back(reply);
        self
    }

    pub fn page_delay(&self, delay: Duration) -> &Self {
        self.script.lock().unwrap().page_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Poll(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.script.lock().unwrap().calls.push(call);
    }
}

fn exhausted(what: &str) -> ClientError {
    ClientError::Malformed(format!("no scripted {} reply", what))
}

impl Transport for ScriptedTransport {
    async fn create_thread(&self, _options: &ThreadOptions) -> Result<Reply, ClientError> {
        self.record(Call::CreateThread);
        let reply = self.script.lock().unwrap().create.pop_front();
        reply.ok_or_else(|| exhausted("create"))
    }

    async fn submit_message(
        &self,
        thread_id: &str,
        request: &MessageRequest,
    ) -> Result<Reply, ClientError> {
        self.record(Call::Submit {
            thread_id: thread_id.to_string(),
            input: request.input.clone(),
        });
        let reply = self.script.lock().unwrap().submit.pop_front();
        reply.ok_or_else(|| exhausted("submit"))
    }

    async fn poll_job(&self, status_url: &str) -> Result<Reply, ClientError> {
        self.record(Call::Poll(status_url.to_string()));
        let (reply, delay) = {
            let mut script = self.script.lock().unwrap();
            let reply = script
                .polls
                .pop_front()
                .or_else(|| script.poll_fallback.clone());
            (reply, script.poll_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.ok_or_else(|| exhausted("poll"))
    }

    async fn fetch_interactions(
        &self,
        thread_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<Reply, ClientError> {
        self.record(Call::Fetch {
            thread_id: thread_id.to_string(),
            page_size,
            cursor: cursor.map(String::from),
        });
        let (reply, delay) = {
            let mut script = self.script.lock().unwrap();
            (script.pages.pop_front(), script.page_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.ok_or_else(|| exhausted("fetch"))
    }
}

pub fn thread_created(id: &str) -> Reply {
    Reply::new(200, json!({ "id": id }))
}

pub fn accepted(status_url: &str) -> Reply {
    Reply::new(202, json!({ "status": "PENDING", "status_url": status_url }))
}

pub fn in_progress(content: Option<&str>) -> Reply {
    let model_response = match content {
        Some(text) => json!({ "content": text }),
        None => Value::Null,
    };
    Reply::new(
        200,
        json!({
            "status": "IN_PROGRESS",
            "response": { "interaction": { "model_response": model_response } }
        }),
    )
}

pub fn failed() -> Reply {
    Reply::new(200, json!({ "status": "FAILED", "response": {} }))
}

/// A finished interaction citing the given titles in order.
pub fn interaction(id: &str, content: &str, cited: &[&str]) -> Value {
    let ranked: Vec<Value> = cited
        .iter()
        .map(|title| {
            json!({
                "content": format!("passage from {}", title),
                "metadata": { "document": { "title": title, "link_to_source": "" } }
            })
        })
        .collect();
    let references: Vec<Value> = (0..cited.len())
        .map(|i| json!({ "result_index": i }))
        .collect();

    json!({
        "id": id,
        "user_input": "ignored",
        "model_response": { "content": content },
        "references": references,
        "ranked_results": ranked,
        "search_queries": ["query"]
    })
}

pub fn complete(id: &str, content: &str, cited: &[&str]) -> Reply {
    Reply::new(
        200,
        json!({
            "status": "COMPLETE",
            "response": { "interaction": interaction(id, content, cited) }
        }),
    )
}

pub fn answered(id: &str, content: &str) -> Reply {
    Reply::new(200, json!({ "interaction": interaction(id, content, &[]) }))
}

/// A history page holding interactions with the given ids.
pub fn page(ids: &[&str], next_page_token: Option<&str>) -> Reply {
    let interactions: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "user_input": format!("question {}", id),
                "model_response": { "content": format!("answer {}", id) }
            })
        })
        .collect();
    Reply::new(
        200,
        json!({ "interactions": interactions, "next_page_token": next_page_token }),
    )
}

/// Collects every completion report the session hands out.
#[derive(Clone, Default)]
pub struct Reports(Arc<Mutex<Vec<CompletionReport>>>);

impl Reports {
    pub fn callback(&self) -> impl Fn(&CompletionReport) + Send + Sync + 'static {
        let reports = Arc::clone(&self.0);
        move |report| reports.lock().unwrap().push(report.clone())
    }

    pub fn statuses(&self) -> Vec<u16> {
        self.0.lock().unwrap().iter().map(|r| r.status).collect()
    }

    pub fn all(&self) -> Vec<CompletionReport> {
        self.0.lock().unwrap().clone()
    }
}

/// Waits for the first event matching `pred`, returning it.
pub async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<ThreadEvent>,
    pred: impl Fn(&ThreadEvent) -> bool,
) -> ThreadEvent {
    loop {
        let event = rx.recv().await.expect("session dropped");
        if pred(&event) {
            return event;
        }
    }
}

/// Everything already queued on `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ThreadEvent>) -> Vec<ThreadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
