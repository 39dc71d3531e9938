//! The streaming reconciliation engine.
//!
//! A `ChatSession` owns one thread's state and drives each generation through
//! submit, polling, paced reveal and finalization. Presentation adapters hold a
//! clone of the session, read `view()` snapshots and listen to `ThreadEvent`s.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_client::{
    Interaction, InteractionPage, JobHandle, JobStatus, Transport, message_request_body,
    parse_job_handle, parse_job_snapshot, parse_sync_interaction, parse_thread_id,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::chunker::chunk;
use crate::config::WidgetConfig;
use crate::error::ChatError;
use crate::event::{CompletionCallback, CompletionReport, ThreadEvent};
use crate::history::{assistant_message, format_history};
use crate::message::{GREETING_ID, Message};
use crate::session::{SessionSnapshot, SessionStore};
use crate::state::{JobPhase, JobTicket, ThreadState, ThreadView};

/// Callback statuses for outcomes that have no HTTP status of their own.
const STATUS_FAILED: u16 = 500;
const STATUS_TIMED_OUT: u16 = 504;
const STATUS_NO_RESPONSE: u16 = 0;

pub(crate) struct Inner<T> {
    pub(crate) transport: T,
    pub(crate) config: WidgetConfig,
    state: Mutex<ThreadState>,
    observers: Mutex<Vec<mpsc::UnboundedSender<ThreadEvent>>>,
    on_complete: Option<CompletionCallback>,
    store: Option<Arc<dyn SessionStore>>,
}

/// One chat thread bound to a transport.
///
/// Cloning is cheap and every clone drives the same thread.
pub struct ChatSession<T> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T> Clone for ChatSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub struct ChatSessionBuilder<T> {
    transport: T,
    config: WidgetConfig,
    thread_id: Option<String>,
    store: Option<Arc<dyn SessionStore>>,
    on_complete: Option<CompletionCallback>,
}

impl<T: Transport> ChatSessionBuilder<T> {
    /// Continue an existing thread instead of creating one on `open`.
    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into()).filter(|t| !t.is_empty());
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Called once per generation that completed, failed or was rejected.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CompletionReport) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Builds the session, restoring the stored snapshot when it belongs to
    /// the same thread (or no thread was given).
    pub fn build(self) -> ChatSession<T> {
        let mut state = ThreadState::new(self.thread_id);

        if let Some(store) = &self.store {
            match SessionSnapshot::load(store.as_ref()) {
                Ok(Some(snapshot)) => {
                    let same_thread =
                        state.thread_id.is_none() || state.thread_id == snapshot.thread_id;
                    if same_thread {
                        debug!(
                            thread = ?snapshot.thread_id,
                            messages = snapshot.messages.len(),
                            "Restored session snapshot"
                        );
                        state.thread_id = snapshot.thread_id.filter(|t| !t.is_empty());
                        state.messages = snapshot.messages;
                        state.next_page_cursor = snapshot.next_page_cursor.filter(|c| !c.is_empty());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring unreadable session snapshot"),
            }
        }

        ChatSession {
            inner: Arc::new(Inner {
                transport: self.transport,
                config: self.config,
                state: Mutex::new(state),
                observers: Mutex::new(Vec::new()),
                on_complete: self.on_complete,
                store: self.store,
            }),
        }
    }
}

/// How a submit left the transport.
enum Submitted {
    Complete(Interaction),
    Job(JobHandle),
}

impl<T: Transport> ChatSession<T> {
    pub fn builder(transport: T, config: WidgetConfig) -> ChatSessionBuilder<T> {
        ChatSessionBuilder {
            transport,
            config,
            thread_id: None,
            store: None,
            on_complete: None,
        }
    }

    pub fn new(transport: T, config: WidgetConfig) -> Self {
        Self::builder(transport, config).build()
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn thread_id(&self) -> Option<String> {
        self.lock().thread_id.clone()
    }

    pub fn view(&self) -> ThreadView {
        self.lock().view()
    }

    /// Receives every event published after this call, in order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ThreadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Records the top-most message the renderer currently shows.
    pub fn set_viewport_top(&self, message_id: Option<String>) {
        self.lock().viewport_top = message_id;
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: ThreadEvent) {
        let mut observers = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn notice(&self, error: &ChatError) {
        self.emit(ThreadEvent::Notice(error.to_string()));
    }

    /// Mount sequence: create a thread when none is known, otherwise load the
    /// newest page of its history.
    pub async fn open(&self) -> Result<(), ChatError> {
        let thread_id = self.thread_id();
        match thread_id {
            None => self.create_thread().await.map(|_| ()),
            Some(thread_id) => {
                self.emit(ThreadEvent::ThreadReady { thread_id });
                self.load_first_page().await.map(|_| ())
            }
        }
    }

    /// Creates a fresh backend thread and makes it this session's thread.
    ///
    /// A new thread has no history, so the message list becomes just the
    /// greeting; nothing is fetched.
    pub async fn create_thread(&self) -> Result<String, ChatError> {
        let epoch = self.lock().epoch;
        let options = self.inner.config.generation.thread_options();

        let reply = match self.inner.transport.create_thread(&options).await {
            Ok(reply) => reply,
            Err(e) => {
                let err = ChatError::from(e);
                self.notice(&err);
                return Err(err);
            }
        };
        if !reply.is_ok() {
            let err = ChatError::Auth {
                status: reply.status,
            };
            warn!(status = reply.status, "Thread creation refused");
            self.notice(&err);
            return Err(err);
        }
        let thread_id = match parse_thread_id(&reply.body) {
            Ok(thread_id) => thread_id,
            Err(e) => {
                warn!(error = %e, "Thread created without a usable id");
                let err = ChatError::from(e);
                self.notice(&err);
                return Err(err);
            }
        };

        let greeting = format_history(
            Some(&InteractionPage::default()),
            Some(&self.inner.config.greeting),
        );
        let (event, thread_id) = {
            let mut state = self.lock();
            if state.epoch != epoch {
                return Err(ChatError::Superseded);
            }
            state.thread_id = Some(thread_id.clone());
            state.next_page_cursor = None;

            let event = if state.messages.is_empty() {
                state.messages = greeting;
                ThreadEvent::HistoryLoaded {
                    count: state.messages.len(),
                }
            } else {
                // A submit is already on screen; slot the greeting in above it.
                let greeting = if state.messages.iter().any(|m| m.id == GREETING_ID) {
                    Vec::new()
                } else {
                    greeting
                };
                let count = greeting.len();
                state.prepend(greeting, None);
                ThreadEvent::HistoryPrepended {
                    count,
                    anchor: None,
                }
            };
            (event, thread_id)
        };

        info!(thread = %thread_id, "Created chat thread");
        self.emit(ThreadEvent::ThreadReady {
            thread_id: thread_id.clone(),
        });
        self.emit(event);
        self.persist();
        Ok(thread_id)
    }

    /// Sends `text` and drives the resulting generation to its end.
    ///
    /// Returns the finalized assistant message. A submit while another
    /// generation is running is rejected with `ChatError::Busy`.
    pub async fn submit(&self, text: &str) -> Result<Message, ChatError> {
        let begun = self.lock().begin_job(text);
        let Some((ticket, user_message)) = begun else {
            debug!("Submit rejected: generation already running");
            return Err(ChatError::Busy);
        };
        self.emit(ThreadEvent::MessageAppended(user_message));
        self.emit(ThreadEvent::Thinking(true));

        let request = self.inner.config.generation.message_request(text);
        let payload = message_request_body(&request);

        let thread_id = match self.thread_id() {
            Some(thread_id) => thread_id,
            None => match self.create_thread().await {
                Ok(thread_id) => thread_id,
                Err(e) => {
                    // create_thread already raised the notice.
                    let status = match &e {
                        ChatError::Auth { status } => *status,
                        _ => STATUS_NO_RESPONSE,
                    };
                    if self.end_job(&ticket, JobPhase::Failed) {
                        self.report(payload, Value::Null, status);
                    }
                    return Err(e);
                }
            },
        };
        self.ensure_owned(&ticket)?;

        info!(thread = %thread_id, job = ticket.job, "Submitting message");

        let submitted = self
            .inner
            .transport
            .submit_message(&thread_id, &request)
            .await;
        self.ensure_owned(&ticket)?;

        let reply = match submitted {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Submit failed before a response");
                let err = ChatError::from(e);
                self.abort(&ticket, JobPhase::Failed, &payload, Value::Null, STATUS_NO_RESPONSE, &err);
                return Err(err);
            }
        };

        let parsed = match reply.status {
            200 => parse_sync_interaction(&reply.body).map(Submitted::Complete),
            202 => parse_job_handle(&reply.body).map(Submitted::Job),
            status => {
                warn!(status, "Submit rejected by backend");
                let err = ChatError::Rejected { status };
                self.abort(&ticket, JobPhase::Failed, &payload, reply.body, status, &err);
                return Err(err);
            }
        };

        match parsed {
            Ok(Submitted::Complete(interaction)) => {
                debug!(job = ticket.job, "Backend answered synchronously");
                self.finalize(&ticket, &interaction, payload, reply.body, reply.status)
            }
            Ok(Submitted::Job(handle)) => {
                debug!(job = ticket.job, status = ?handle.status, "Backend accepted job");
                self.poll_loop(&ticket, &handle, payload).await
            }
            Err(e) => {
                let err = ChatError::from(e);
                self.abort(&ticket, JobPhase::Failed, &payload, reply.body, reply.status, &err);
                Err(err)
            }
        }
    }

    async fn poll_loop(
        &self,
        ticket: &JobTicket,
        handle: &JobHandle,
        payload: Value,
    ) -> Result<Message, ChatError> {
        let pacing = &self.inner.config.pacing;
        let model = self.inner.config.generation.model.as_str();
        let mut last_body = Value::Null;

        {
            let mut state = self.lock();
            let job = state.job_mut(ticket).ok_or(ChatError::Superseded)?;
            job.phase = JobPhase::Polling;
        }

        for poll in 1..=pacing.max_polls {
            {
                let mut state = self.lock();
                let job = state.job_mut(ticket).ok_or(ChatError::Superseded)?;
                job.polls = poll;
            }

            let polled = self.inner.transport.poll_job(&handle.status_url).await;
            self.ensure_owned(ticket)?;

            let reply = match polled {
                Ok(reply) if reply.is_ok() => reply,
                Ok(reply) => {
                    warn!(poll, status = reply.status, "Poll returned an error status");
                    sleep(pacing.poll_interval()).await;
                    continue;
                }
                Err(e) => {
                    warn!(poll, error = %e, "Poll failed");
                    sleep(pacing.poll_interval()).await;
                    continue;
                }
            };
            let snapshot = match parse_job_snapshot(&reply.body) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(poll, error = %e, "Unreadable poll response");
                    sleep(pacing.poll_interval()).await;
                    continue;
                }
            };
            last_body = reply.body;
            debug!(poll, status = ?snapshot.status, "Polled job");

            if snapshot.status == JobStatus::Failed {
                let err = ChatError::GenerationFailed;
                self.abort(ticket, JobPhase::Failed, &payload, last_body, STATUS_FAILED, &err);
                return Err(err);
            }

            let revealed = match snapshot.interaction.model_response.as_deref() {
                Some(content) => self.reveal(ticket, content, model).await?,
                None => false,
            };

            if snapshot.status == JobStatus::Complete {
                return self.finalize(ticket, &snapshot.interaction, payload, last_body, 200);
            }
            if !revealed {
                sleep(pacing.poll_interval()).await;
            }
        }

        let err = ChatError::GenerationTimedOut {
            polls: pacing.max_polls,
        };
        warn!(job = ticket.job, polls = pacing.max_polls, "Giving up on generation");
        self.abort(ticket, JobPhase::TimedOut, &payload, last_body, STATUS_TIMED_OUT, &err);
        Err(err)
    }

    /// Reveals whatever `content` adds to the job's revealed text, one paced
    /// chunk at a time. Returns whether anything new was shown.
    async fn reveal(&self, ticket: &JobTicket, content: &str, model: &str) -> Result<bool, ChatError> {
        let shown = {
            let mut state = self.lock();
            let job = state.job_mut(ticket).ok_or(ChatError::Superseded)?;
            job.revealed.clone()
        };

        let chunks = match chunk(&shown, content) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(job = ticket.job, error = %e, "Replacing revealed text wholesale");
                self.show_revealed(ticket, |revealed| {
                    revealed.clear();
                    revealed.push_str(content);
                })?;
                return Ok(true);
            }
        };
        if chunks.is_empty() {
            return Ok(false);
        }

        let delay = self.inner.config.pacing.chunk_delay(model, chunks.len());
        for piece in &chunks {
            self.show_revealed(ticket, |revealed| revealed.push_str(piece))?;
            sleep(delay).await;
        }
        Ok(true)
    }

    /// Applies `update` to the job's revealed text and shows the result in
    /// the in-flight message, clearing the thinking indicator.
    fn show_revealed(
        &self,
        ticket: &JobTicket,
        update: impl FnOnce(&mut String),
    ) -> Result<(), ChatError> {
        let (content, was_thinking) = {
            let mut state = self.lock();
            let job = state.job_mut(ticket).ok_or(ChatError::Superseded)?;
            job.phase = JobPhase::Revealing;
            update(&mut job.revealed);
            let content = job.revealed.clone();

            state.show_streaming(&content);
            let was_thinking = std::mem::replace(&mut state.thinking, false);
            (content, was_thinking)
        };

        if was_thinking {
            self.emit(ThreadEvent::Thinking(false));
        }
        self.emit(ThreadEvent::StreamingUpdated { content });
        Ok(())
    }

    fn finalize(
        &self,
        ticket: &JobTicket,
        interaction: &Interaction,
        payload: Value,
        response: Value,
        status: u16,
    ) -> Result<Message, ChatError> {
        let id = interaction
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ticket.local_id.clone());
        let mut message = assistant_message(&id, interaction);

        let was_thinking = {
            let mut state = self.lock();
            let job = state.job_mut(ticket).ok_or(ChatError::Superseded)?;
            if interaction.model_response.is_none() {
                message.content = job.revealed.clone();
            }
            job.phase = JobPhase::Complete;

            let was_thinking = state.thinking;
            state.complete_job(ticket, message.clone(), &id);
            was_thinking
        };

        info!(job = ticket.job, interaction = %id, sources = message.sources.len(), "Generation complete");
        if was_thinking {
            self.emit(ThreadEvent::Thinking(false));
        }
        self.emit(ThreadEvent::Finalized(message.clone()));
        self.emit(ThreadEvent::JobEnded {
            job: ticket.job,
            phase: JobPhase::Complete,
        });
        self.persist();
        self.report(payload, response, status);
        Ok(message)
    }

    /// Ends a job that will not complete and tells everyone why.
    fn abort(
        &self,
        ticket: &JobTicket,
        phase: JobPhase,
        payload: &Value,
        response: Value,
        status: u16,
        error: &ChatError,
    ) {
        if self.end_job(ticket, phase) {
            self.notice(error);
            self.report(payload.clone(), response, status);
        }
    }

    /// Returns false when the job was no longer ours to end.
    fn end_job(&self, ticket: &JobTicket, phase: JobPhase) -> bool {
        let was_thinking = {
            let mut state = self.lock();
            if !state.owns(ticket) {
                return false;
            }
            if let Some(job) = state.job_mut(ticket) {
                job.phase = phase;
            }
            let was_thinking = state.thinking;
            state.abandon_job(ticket);
            was_thinking
        };

        if was_thinking {
            self.emit(ThreadEvent::Thinking(false));
        }
        self.emit(ThreadEvent::JobEnded {
            job: ticket.job,
            phase,
        });
        self.persist();
        true
    }

    fn ensure_owned(&self, ticket: &JobTicket) -> Result<(), ChatError> {
        if self.lock().owns(ticket) {
            Ok(())
        } else {
            debug!(job = ticket.job, "Discarding work of a superseded job");
            Err(ChatError::Superseded)
        }
    }

    fn report(&self, payload: Value, response: Value, status: u16) {
        if let Some(callback) = &self.inner.on_complete {
            callback(&CompletionReport {
                payload,
                response,
                status,
            });
        }
    }

    /// Writes the current thread to the session store, if there is one.
    pub fn save_session(&self) -> Result<(), ChatError> {
        let Some(store) = &self.inner.store else {
            return Ok(());
        };
        let snapshot = {
            let state = self.lock();
            SessionSnapshot {
                thread_id: state.thread_id.clone(),
                messages: state
                    .messages
                    .iter()
                    .filter(|m| !m.is_streaming())
                    .cloned()
                    .collect(),
                next_page_cursor: state.next_page_cursor.clone(),
            }
        };
        snapshot.save(store.as_ref())?;
        Ok(())
    }

    pub(crate) fn persist(&self) {
        if let Err(e) = self.save_session() {
            warn!(error = %e, "Failed to save session snapshot");
        }
    }

    /// Forgets the current thread. Running work is discarded as it returns.
    ///
    /// Call `open` (or use `new_thread`) to start the next thread.
    pub fn reset(&self) -> Result<(), ChatError> {
        self.lock().reset();
        info!("Thread reset");
        self.emit(ThreadEvent::Reset);

        if let Some(store) = &self.inner.store {
            SessionSnapshot::clear(store.as_ref())?;
        }
        Ok(())
    }

    /// Resets and immediately creates the replacement thread.
    pub async fn new_thread(&self) -> Result<String, ChatError> {
        self.reset()?;
        self.create_thread().await
    }
}
