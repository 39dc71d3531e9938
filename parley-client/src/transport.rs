use std::future::Future;

use serde_json::Value;

use crate::error::ClientError;
use crate::types::{MessageRequest, ThreadOptions};

/// Raw status and JSON body of one backend call.
///
/// Interpreting the status is left to the caller: a 202 from submit and a 200
/// from submit mean different things, and a non-200 on thread creation means
/// bad credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Request/response channel to the chat backend.
///
/// `Err` is reserved for failures below HTTP (connection, unreadable body);
/// every response the server actually sent comes back as a `Reply`.
pub trait Transport: Send + Sync {
    fn create_thread(
        &self,
        options: &ThreadOptions,
    ) -> impl Future<Output = Result<Reply, ClientError>> + Send;

    fn submit_message(
        &self,
        thread_id: &str,
        request: &MessageRequest,
    ) -> impl Future<Output = Result<Reply, ClientError>> + Send;

    fn poll_job(&self, status_url: &str) -> impl Future<Output = Result<Reply, ClientError>> + Send;

    fn fetch_interactions(
        &self,
        thread_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<Reply, ClientError>> + Send;
}
