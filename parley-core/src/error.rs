use parley_client::ClientError;
use thiserror::Error;

use crate::session::StoreError;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Thread creation was refused; usually a bad API key pair.
    #[error("Could not create chat thread (HTTP {status}); check the API key and secret")]
    Auth { status: u16 },

    #[error("Generation failed")]
    GenerationFailed,

    #[error("Generation timed out after {polls} polls")]
    GenerationTimedOut { polls: u32 },

    #[error("Error getting chat history (HTTP {status})")]
    Pagination { status: u16 },

    #[error("Message rejected (HTTP {status})")]
    Rejected { status: u16 },

    #[error("A response is already being generated")]
    Busy,

    #[error("Job was superseded by a thread reset")]
    Superseded,

    #[error("Transport error: {0}")]
    Transport(#[from] ClientError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}
