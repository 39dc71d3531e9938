//! HTTP client for the hosted chat backend.
//!
//! The backend answers messages either synchronously or through an async job
//! that has to be polled. This crate only moves requests and replies; the
//! streaming and pagination logic lives in `parley-core`.
//!
//! # Example
//!
//! ```ignore
//! use parley_client::{ApiClient, GenerationConfig, Transport, parse_thread_id};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ApiClient::new("api-key", "api-secret");
//!     let config = GenerationConfig::default();
//!
//!     let reply = client.create_thread(&config.thread_options()).await.unwrap();
//!     let thread_id = parse_thread_id(&reply.body).unwrap();
//!
//!     let reply = client
//!         .submit_message(&thread_id, &config.message_request("Hello!"))
//!         .await
//!         .unwrap();
//!     assert!(reply.status == 200 || reply.status == 202);
//! }
//! ```

mod client;
mod convert;
mod error;
mod transport;
mod types;

pub use client::{ApiClient, DEFAULT_BASE_URL, credential_token};
pub use convert::{
    clamp_temperature, message_request_body, parse_interaction, parse_interaction_page,
    parse_job_handle, parse_job_snapshot, parse_sync_interaction, parse_thread_id,
    thread_request_body,
};
pub use error::ClientError;
pub use transport::{Reply, Transport};
pub use types::{
    Document, GenerationConfig, Interaction, InteractionPage, JobHandle, JobSnapshot, JobStatus,
    MessageRequest, RankedResult, ResponseLength, SegmentLength, ThreadOptions,
};
