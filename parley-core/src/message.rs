use parley_client::{Document, RankedResult};
use serde::{Deserialize, Serialize};

/// Id of the synthetic greeting; sorts before every real interaction id.
pub const GREETING_ID: &str = "ai_0000000000";

/// Id carried by the assistant message while it is still being revealed.
pub const STREAMING_ID: &str = "ai_streaming";

const LOCAL_ID_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A citation attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub document: Document,
    pub display_title: String,
}

impl Source {
    pub fn has_link(&self) -> bool {
        !self.document.link_to_source.is_empty()
    }
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub search_results: Vec<RankedResult>,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            search_queries: Vec::new(),
            search_results: Vec::new(),
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            sources: Vec::new(),
            search_queries: Vec::new(),
            search_results: Vec::new(),
        }
    }

    pub fn greeting(text: impl Into<String>) -> Self {
        Self::assistant(GREETING_ID, text)
    }

    pub fn is_streaming(&self) -> bool {
        self.id == STREAMING_ID
    }

    /// Numeric part of a `user_<n>` / `ai_<n>` id, if it is all digits.
    pub fn numeric_id(&self) -> Option<u64> {
        numeric_suffix(&self.id)
    }
}

fn numeric_suffix(id: &str) -> Option<u64> {
    let (_, digits) = id.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Zero-padded local id, one above the highest numeric id among `messages`.
pub fn next_local_id<'a>(messages: impl IntoIterator<Item = &'a Message>) -> String {
    let max = messages
        .into_iter()
        .filter_map(Message::numeric_id)
        .max()
        .unwrap_or(0);
    format!("{:0width$}", max + 1, width = LOCAL_ID_WIDTH)
}

pub fn user_id(n: &str) -> String {
    format!("user_{}", n)
}

pub fn assistant_id(n: &str) -> String {
    format!("ai_{}", n)
}

/// Terminal id for an assistant message whose job never completed.
pub fn unfinished_id(local: &str) -> String {
    format!("ai_{}_unfinished", local)
}
