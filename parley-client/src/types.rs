use serde::{Deserialize, Serialize};

/// Target length of the knowledge-base segments retrieved for a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Requested length of the generated answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl std::str::FromStr for SegmentLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(SegmentLength::Short),
            "medium" => Ok(SegmentLength::Medium),
            "long" => Ok(SegmentLength::Long),
            _ => Err(format!("unknown segment length: {}", s)),
        }
    }
}

impl std::fmt::Display for SegmentLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentLength::Short => write!(f, "short"),
            SegmentLength::Medium => write!(f, "medium"),
            SegmentLength::Long => write!(f, "long"),
        }
    }
}

impl std::fmt::Display for ResponseLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseLength::Short => write!(f, "short"),
            ResponseLength::Medium => write!(f, "medium"),
            ResponseLength::Long => write!(f, "long"),
        }
    }
}

/// Per-thread generation settings supplied by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub knowledge_base_ids: Vec<String>,
    pub temperature: f64,
    pub segment_length: SegmentLength,
    pub response_length: ResponseLength,
    pub system_message: String,
    pub use_rse: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            knowledge_base_ids: Vec::new(),
            temperature: 0.1,
            segment_length: SegmentLength::default(),
            response_length: ResponseLength::default(),
            system_message: String::new(),
            use_rse: true,
        }
    }
}

impl GenerationConfig {
    pub fn thread_options(&self) -> ThreadOptions {
        ThreadOptions {
            knowledge_base_ids: self.knowledge_base_ids.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            system_message: self.system_message.clone(),
        }
    }

    pub fn message_request(&self, input: impl Into<String>) -> MessageRequest {
        MessageRequest {
            input: input.into(),
            model: self.model.clone(),
            temperature: self.temperature,
            use_rse: self.use_rse,
            segment_length: self.segment_length,
            response_length: self.response_length,
            system_message: self.system_message.clone(),
            knowledge_base_ids: self.knowledge_base_ids.clone(),
        }
    }
}

/// Default options attached to a newly created thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadOptions {
    pub knowledge_base_ids: Vec<String>,
    pub model: String,
    pub temperature: f64,
    pub system_message: String,
}

/// A request for the assistant to answer `input` within a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRequest {
    pub input: String,
    pub model: String,
    pub temperature: f64,
    pub use_rse: bool,
    pub segment_length: SegmentLength,
    pub response_length: ResponseLength,
    pub system_message: String,
    pub knowledge_base_ids: Vec<String>,
}

/// Document a ranked result was cut from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    /// Empty when the document has no external link.
    #[serde(default)]
    pub link_to_source: String,
}

/// One retrieved passage the model could cite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(default)]
    pub content: String,
    pub metadata: Document,
}

/// Backend-side status of an asynchronous generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "COMPLETE" => JobStatus::Complete,
            "FAILED" => JobStatus::Failed,
            "PENDING" => JobStatus::Pending,
            _ => JobStatus::InProgress,
        }
    }
}

/// One recorded user/assistant exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interaction {
    pub id: Option<String>,
    pub user_input: Option<String>,
    /// `None` until the model has produced any text.
    pub model_response: Option<String>,
    pub references: Vec<usize>,
    pub ranked_results: Vec<RankedResult>,
    pub search_queries: Vec<String>,
}

/// Handle returned when the backend accepts a message for async generation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub status: JobStatus,
    pub status_url: String,
}

/// Result of one poll of a generation job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub interaction: Interaction,
}

/// One page of a thread's recorded interactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionPage {
    pub interactions: Vec<Interaction>,
    /// Cursor for the next (older) page; `None` when no older pages remain.
    pub next_page_token: Option<String>,
}
