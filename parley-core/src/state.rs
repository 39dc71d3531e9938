//! Per-widget thread state and the transitions the engine applies to it.
//!
//! Every method here is synchronous; the engine takes the state lock, applies
//! one transition and releases it before the next await.

use crate::message::{
    Message, STREAMING_ID, next_local_id, unfinished_id, user_id,
};

/// Lifecycle of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Submitted,
    Polling,
    Revealing,
    Complete,
    Failed,
    TimedOut,
}

/// The single in-flight generation of a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: u64,
    pub phase: JobPhase,
    /// Text already revealed for this job.
    pub revealed: String,
    pub polls: u32,
    /// Local id shared by the optimistic user message and its answer.
    pub local_id: String,
}

/// Identifies a job together with the thread epoch it was started in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    pub job: u64,
    pub epoch: u64,
    pub local_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScrollMode {
    /// Keep the newest message in view.
    #[default]
    FollowTail,
    /// Keep this message where it was while older history is spliced in above.
    Anchored(String),
}

#[derive(Debug, Default)]
pub struct ThreadState {
    pub thread_id: Option<String>,
    /// Oldest first: paginated history, then live activity.
    pub messages: Vec<Message>,
    pub next_page_cursor: Option<String>,
    pub thinking: bool,
    pub job: Option<GenerationJob>,
    /// Bumped on every reset; work started under an older epoch is stale.
    pub epoch: u64,
    pub scroll: ScrollMode,
    pub backfilling: bool,
    /// Top-most message currently intersecting the viewport, as reported by the renderer.
    pub viewport_top: Option<String>,
    next_job_id: u64,
}

/// Cloned, render-ready view of a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadView {
    pub thread_id: Option<String>,
    pub messages: Vec<Message>,
    pub thinking: bool,
    pub busy: bool,
    pub phase: Option<JobPhase>,
    /// Polls spent by the running job so far.
    pub polls: u32,
    pub has_more_history: bool,
    pub backfilling: bool,
    pub scroll: ScrollMode,
}

impl ThreadState {
    pub fn new(thread_id: Option<String>) -> Self {
        Self {
            thread_id: thread_id.filter(|t| !t.is_empty()),
            ..Self::default()
        }
    }

    /// True exactly when a "load more" affordance should be shown.
    pub fn has_more_history(&self) -> bool {
        self.next_page_cursor.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn owns(&self, ticket: &JobTicket) -> bool {
        self.epoch == ticket.epoch && self.job.as_ref().is_some_and(|j| j.id == ticket.job)
    }

    pub fn job_mut(&mut self, ticket: &JobTicket) -> Option<&mut GenerationJob> {
        if self.epoch != ticket.epoch {
            return None;
        }
        self.job.as_mut().filter(|j| j.id == ticket.job)
    }

    /// Appends the optimistic user message and opens a job for it.
    ///
    /// Returns `None` when a job is already running.
    pub fn begin_job(&mut self, text: &str) -> Option<(JobTicket, Message)> {
        if self.job.is_some() {
            return None;
        }

        let local_id = next_local_id(&self.messages);
        let message = Message::user(user_id(&local_id), text);
        self.messages.push(message.clone());

        self.next_job_id += 1;
        self.job = Some(GenerationJob {
            id: self.next_job_id,
            phase: JobPhase::Submitted,
            revealed: String::new(),
            polls: 0,
            local_id: local_id.clone(),
        });
        self.thinking = true;
        self.scroll = ScrollMode::FollowTail;

        let ticket = JobTicket {
            job: self.next_job_id,
            epoch: self.epoch,
            local_id,
        };
        Some((ticket, message))
    }

    fn streaming_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_streaming)
    }

    /// Shows `content` in the in-flight assistant message, creating it on first use.
    pub fn show_streaming(&mut self, content: &str) {
        match self.streaming_index() {
            Some(i) => self.messages[i].content = content.to_string(),
            None => self.messages.push(Message::assistant(STREAMING_ID, content)),
        }
    }

    /// Replaces the in-flight message with the authoritative one and closes the job.
    ///
    /// The optimistic user message is re-keyed to the interaction id so the pair
    /// matches what a history fetch would produce.
    pub fn complete_job(&mut self, ticket: &JobTicket, message: Message, interaction_id: &str) {
        match self.streaming_index() {
            Some(i) => self.messages[i] = message,
            None => self.messages.push(message),
        }

        let local_user = user_id(&ticket.local_id);
        if let Some(user) = self.messages.iter_mut().rev().find(|m| m.id == local_user) {
            user.id = user_id(interaction_id);
        }

        self.thinking = false;
        self.job = None;
    }

    /// Closes a job that will never complete, keeping whatever was revealed.
    pub fn abandon_job(&mut self, ticket: &JobTicket) {
        if let Some(i) = self.streaming_index() {
            self.messages[i].id = unfinished_id(&ticket.local_id);
        }
        self.thinking = false;
        self.job = None;
    }

    /// Splices an older page in front of everything currently shown.
    pub fn prepend(&mut self, older: Vec<Message>, next_page_cursor: Option<String>) {
        self.messages.splice(0..0, older);
        self.next_page_cursor = next_page_cursor.filter(|c| !c.is_empty());
    }

    /// Message to hold in place during a backfill.
    pub fn scroll_anchor(&self) -> Option<String> {
        self.viewport_top
            .as_ref()
            .filter(|id| self.messages.iter().any(|m| &m.id == *id))
            .cloned()
            .or_else(|| self.messages.first().map(|m| m.id.clone()))
    }

    /// Drops all live state and starts a new epoch.
    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        let next_job_id = self.next_job_id;
        *self = Self {
            epoch,
            next_job_id,
            ..Self::default()
        };
    }

    pub fn view(&self) -> ThreadView {
        ThreadView {
            thread_id: self.thread_id.clone(),
            messages: self.messages.clone(),
            thinking: self.thinking,
            busy: self.is_busy(),
            phase: self.job.as_ref().map(|j| j.phase),
            polls: self.job.as_ref().map_or(0, |j| j.polls),
            has_more_history: self.has_more_history(),
            backfilling: self.backfilling,
            scroll: self.scroll.clone(),
        }
    }
}
