//! A transport with no backend behind it, for driving the chat screen in tests.

use parley_client::{ClientError, MessageRequest, Reply, ThreadOptions, Transport};
use parley_core::{ChatSession, WidgetConfig};

use super::app::ChatApp;

pub struct Offline;

fn offline() -> ClientError {
    ClientError::Malformed("offline".to_string())
}

impl Transport for Offline {
    async fn create_thread(&self, _: &ThreadOptions) -> Result<Reply, ClientError> {
        Err(offline())
    }

    async fn submit_message(&self, _: &str, _: &MessageRequest) -> Result<Reply, ClientError> {
        Err(offline())
    }

    async fn poll_job(&self, _: &str) -> Result<Reply, ClientError> {
        Err(offline())
    }

    async fn fetch_interactions(
        &self,
        _: &str,
        _: u32,
        _: Option<&str>,
    ) -> Result<Reply, ClientError> {
        Err(offline())
    }
}

pub fn offline_app(config: WidgetConfig) -> ChatApp<Offline> {
    ChatApp::new(ChatSession::new(Offline, config))
}
