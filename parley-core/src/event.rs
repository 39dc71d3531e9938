use std::sync::Arc;

use serde_json::Value;

use crate::message::Message;
use crate::state::JobPhase;

/// Ordered change notifications published by a `ChatSession`.
///
/// Events describe what changed; the current state is always available
/// through `ChatSession::view`.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    /// A thread id is known, either restored, given or freshly created.
    ThreadReady { thread_id: String },
    /// The first page of history (or the greeting) replaced the message list.
    HistoryLoaded { count: usize },
    MessageAppended(Message),
    /// The in-flight assistant message now shows `content`.
    StreamingUpdated { content: String },
    Thinking(bool),
    /// The in-flight message was replaced by its authoritative version.
    Finalized(Message),
    JobEnded { job: u64, phase: JobPhase },
    /// `count` older messages were spliced in above `anchor`.
    HistoryPrepended { count: usize, anchor: Option<String> },
    Reset,
    /// Something the user should be told about, e.g. a failed request.
    Notice(String),
}

/// Passed to the completion callback once per finished or failed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    /// The submit body as sent.
    pub payload: Value,
    /// The last raw response observed for the job.
    pub response: Value,
    /// 200 on success, 500 when the job failed, 504 when polling gave up,
    /// the backend's status for a rejected submit and 0 when nothing answered.
    pub status: u16,
}

pub type CompletionCallback = Arc<dyn Fn(&CompletionReport) + Send + Sync>;
