//! Chat thread engine for the hosted conversational backend.
//!
//! `ChatSession` turns the backend's submit-then-poll protocol into a steadily
//! typed answer: each poll's new text is split into a few words at a time and
//! revealed at a model-dependent pace, then swapped for the authoritative
//! message with its sources once the job completes. Older history is paged in
//! above the live tail without disturbing it.
//!
//! The pure pieces (`chunk`, `format_sources`, `format_history`) are exposed
//! for presentation layers that need them directly.

mod chunker;
mod config;
mod engine;
mod error;
mod event;
mod history;
mod message;
mod pagination;
mod session;
mod sources;
mod state;

pub use chunker::{ChunkError, chunk, chunk_with_rng};
pub use config::{
    DEFAULT_GREETING, DEFAULT_PAGE_SIZE, DEFAULT_PLACEHOLDER, RevealPacing, WidgetConfig,
};
pub use engine::{ChatSession, ChatSessionBuilder};
pub use error::ChatError;
pub use event::{CompletionCallback, CompletionReport, ThreadEvent};
pub use history::format_history;
pub use message::{GREETING_ID, Message, Role, STREAMING_ID, Source, next_local_id};
pub use pagination::PageLoad;
pub use session::{MemorySessionStore, SNAPSHOT_KEY, SessionSnapshot, SessionStore, StoreError};
pub use sources::{SourceDisplay, SourceError, format_sources, truncate_title};
pub use state::{JobPhase, ScrollMode, ThreadView};
