use parley_client::Transport;
use parley_core::{ChatSession, ThreadEvent, ThreadView};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

pub struct ChatApp<T> {
    pub should_quit: bool,
    pub session: ChatSession<T>,
    events: UnboundedReceiver<ThreadEvent>,
    pub view: ThreadView,
    pub input: String,
    pub cursor_pos: usize,
    /// Lines scrolled up from the position the scroll mode asks for.
    pub messages_scroll: u16,
    pub last_notice: Option<String>,
    starter_index: usize,
}

impl<T: Transport + 'static> ChatApp<T> {
    pub fn new(session: ChatSession<T>) -> Self {
        let events = session.subscribe();
        let view = session.view();
        Self {
            should_quit: false,
            session,
            events,
            view,
            input: String::new(),
            cursor_pos: 0,
            messages_scroll: 0,
            last_notice: None,
            starter_index: 0,
        }
    }

    pub fn thread_id(&self) -> Option<String> {
        self.view.thread_id.clone()
    }

    /// Mount: create the thread or load its newest page in the background.
    pub fn open_thread(&self) {
        let session = self.session.clone();
        tokio::spawn(async move {
            if let Err(e) = session.open().await {
                debug!(error = %e, "Opening thread failed");
            }
        });
    }

    /// Picks up everything the session did since the last frame.
    pub fn sync(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ThreadEvent::Notice(notice) => self.last_notice = Some(notice),
                ThreadEvent::HistoryPrepended { .. } | ThreadEvent::Reset => {
                    self.messages_scroll = 0;
                }
                _ => {}
            }
        }
        self.view = self.session.view();
    }

    pub fn report_viewport_top(&self, message_id: Option<String>) {
        self.session.set_viewport_top(message_id);
    }

    pub fn send_message(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.view.busy {
            return;
        }

        self.input.clear();
        self.cursor_pos = 0;
        self.messages_scroll = 0;
        self.last_notice = None;

        let session = self.session.clone();
        tokio::spawn(async move {
            if let Err(e) = session.submit(&text).await {
                debug!(error = %e, "Submit ended without an answer");
            }
        });
    }

    /// The "load more" affordance.
    pub fn load_older(&mut self) {
        if !self.view.has_more_history || self.view.backfilling {
            return;
        }
        let session = self.session.clone();
        tokio::spawn(async move {
            if let Err(e) = session.load_older_page().await {
                debug!(error = %e, "Loading older history failed");
            }
        });
    }

    pub fn new_thread(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
        self.last_notice = None;
        let session = self.session.clone();
        tokio::spawn(async move {
            if let Err(e) = session.new_thread().await {
                debug!(error = %e, "Starting a new thread failed");
            }
        });
    }

    /// Whether the thread has nothing from the user yet, so starter prompts apply.
    pub fn is_fresh(&self) -> bool {
        self.view
            .messages
            .iter()
            .all(|m| m.role == parley_core::Role::Assistant)
    }

    /// Cycles the configured starter prompts through an empty input.
    pub fn next_starter_prompt(&mut self) {
        let prompts = &self.session.config().starter_prompts;
        if prompts.is_empty() || !self.is_fresh() {
            return;
        }
        let prompt = prompts[self.starter_index % prompts.len()].clone();
        self.starter_index += 1;
        self.cursor_pos = prompt.len();
        self.input = prompt;
    }

    pub fn scroll_up(&mut self) {
        self.messages_scroll = self.messages_scroll.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.messages_scroll = self.messages_scroll.saturating_sub(1);
    }

    pub fn input_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn input_backspace(&mut self) {
        if self.cursor_pos > 0 {
            let prev_char_boundary = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.remove(prev_char_boundary);
            self.cursor_pos = prev_char_boundary;
        }
    }

    pub fn input_delete(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn input_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn input_right(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.cursor_pos = self.input[self.cursor_pos..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_pos + i)
                .unwrap_or(self.input.len());
        }
    }

    pub fn input_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn input_end(&mut self) {
        self.cursor_pos = self.input.len();
    }
}
