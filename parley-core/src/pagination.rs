//! History paging and the scroll anchor kept while older pages arrive.

use parley_client::{InteractionPage, Transport, parse_interaction_page};
use tracing::{debug, info};

use crate::engine::ChatSession;
use crate::error::ChatError;
use crate::event::ThreadEvent;
use crate::history::format_history;
use crate::message::user_id;
use crate::state::ScrollMode;

/// Outcome of one `load_older_page` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLoad {
    /// Messages spliced in above the previous top.
    pub added: usize,
    /// Message the viewport should stay pinned to.
    pub anchor: Option<String>,
    pub has_more: bool,
}

impl<T: Transport> ChatSession<T> {
    /// Fetches the newest page of the thread and shows it, greeting included
    /// when the thread has no older pages.
    ///
    /// A generation already on screen stays below the loaded page.
    pub async fn load_first_page(&self) -> Result<usize, ChatError> {
        let (thread_id, epoch) = {
            let state = self.lock();
            (state.thread_id.clone(), state.epoch)
        };
        let Some(thread_id) = thread_id else {
            return Ok(0);
        };

        let page_size = self.inner.config.page_size;
        let page = self.fetch_page(&thread_id, page_size, None).await?;
        let messages = format_history(Some(&page), Some(&self.inner.config.greeting));

        let count = {
            let mut state = self.lock();
            if state.epoch != epoch {
                return Err(ChatError::Superseded);
            }

            let first_live = state.job.as_ref().map(|j| user_id(&j.local_id));
            let live_start = first_live
                .and_then(|id| state.messages.iter().position(|m| m.id == id));
            let live = match live_start {
                Some(i) => state.messages.split_off(i),
                None => Vec::new(),
            };
            state.messages = messages;
            state.messages.extend(live);
            state.next_page_cursor = page.next_page_token.clone();
            state.messages.len()
        };

        info!(thread = %thread_id, messages = count, "Loaded thread history");
        self.emit(ThreadEvent::HistoryLoaded { count });
        self.persist();
        Ok(count)
    }

    /// Fetches the next older page and prepends it.
    ///
    /// The tail of the list, including a generation being revealed, is left
    /// alone. While the page is in flight and afterwards the scroll mode is
    /// anchored to the message that was at the top of the viewport. Without
    /// a cursor, or while another backfill runs, nothing is fetched.
    pub async fn load_older_page(&self) -> Result<PageLoad, ChatError> {
        let (thread_id, cursor, epoch, anchor) = {
            let mut state = self.lock();
            let has_more = state.has_more_history();
            let (Some(thread_id), Some(cursor)) =
                (state.thread_id.clone(), state.next_page_cursor.clone())
            else {
                return Ok(PageLoad::default());
            };
            if state.backfilling {
                debug!("Backfill already running");
                return Ok(PageLoad {
                    has_more,
                    ..PageLoad::default()
                });
            }

            let anchor = state.scroll_anchor();
            state.backfilling = true;
            if let Some(anchor) = &anchor {
                state.scroll = ScrollMode::Anchored(anchor.clone());
            }
            (thread_id, cursor, state.epoch, anchor)
        };

        let page_size = self.inner.config.page_size;
        let fetched = self.fetch_page(&thread_id, page_size, Some(&cursor)).await;

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                let mut state = self.lock();
                if state.epoch == epoch {
                    state.backfilling = false;
                }
                return Err(e);
            }
        };
        let older = format_history(Some(&page), None);
        let added = older.len();

        let has_more = {
            let mut state = self.lock();
            if state.epoch != epoch {
                return Err(ChatError::Superseded);
            }
            state.backfilling = false;
            state.prepend(older, page.next_page_token);
            state.has_more_history()
        };

        debug!(thread = %thread_id, added, has_more, "Prepended older history");
        self.emit(ThreadEvent::HistoryPrepended {
            count: added,
            anchor: anchor.clone(),
        });
        self.persist();
        Ok(PageLoad {
            added,
            anchor,
            has_more,
        })
    }

    async fn fetch_page(
        &self,
        thread_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<InteractionPage, ChatError> {
        let reply = match self
            .inner
            .transport
            .fetch_interactions(thread_id, page_size, cursor)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                let err = ChatError::from(e);
                self.notice(&err);
                return Err(err);
            }
        };

        if !reply.is_ok() {
            let err = ChatError::Pagination {
                status: reply.status,
            };
            self.notice(&err);
            return Err(err);
        }
        Ok(parse_interaction_page(&reply.body))
    }
}
