use base64::Engine;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::convert::{message_request_body, thread_request_body};
use crate::error::ClientError;
use crate::transport::{Reply, Transport};
use crate::types::{MessageRequest, ThreadOptions};

pub const DEFAULT_BASE_URL: &str = "https://api.superpowered.ai/v1";

/// Encodes the API key pair into the token sent in the `Authorization` header.
pub fn credential_token(api_key: &str, api_secret: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", api_key, api_secret))
}

/// HTTP client for the chat backend.
pub struct ApiClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApiClient {
    /// Creates a new client for the given key pair.
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self::with_base_url(api_key, api_secret, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL.
    pub fn with_base_url(api_key: &str, api_secret: &str, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            token: credential_token(api_key, api_secret),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Sends a prepared request and captures status and body.
    ///
    /// An unparseable body is an error only on success; error pages are kept
    /// as a JSON string so the caller still sees the status.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Reply, ClientError> {
        let response = request
            .header("Authorization", self.authorization())
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) if status.is_success() => return Err(ClientError::Json(e)),
                Err(_) => Value::String(text),
            }
        };

        debug!(status = status.as_u16(), "Received response");

        Ok(Reply::new(status.as_u16(), body))
    }
}

impl Transport for ApiClient {
    #[instrument(skip(self, options), fields(model = %options.model))]
    async fn create_thread(&self, options: &ThreadOptions) -> Result<Reply, ClientError> {
        debug!("Creating chat thread");
        let request = self
            .http
            .post(format!("{}/chat/threads", self.base_url))
            .json(&thread_request_body(options));
        self.send(request).await
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn submit_message(
        &self,
        thread_id: &str,
        request: &MessageRequest,
    ) -> Result<Reply, ClientError> {
        debug!("Submitting message");
        let request = self
            .http
            .post(format!("{}/chat/threads/{}/get_response", self.base_url, thread_id))
            .json(&message_request_body(request));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn poll_job(&self, status_url: &str) -> Result<Reply, ClientError> {
        self.send(self.http.get(status_url)).await
    }

    #[instrument(skip(self))]
    async fn fetch_interactions(
        &self,
        thread_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<Reply, ClientError> {
        let mut query = vec![("page_size", page_size.to_string())];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            query.push(("next_page_token", cursor.to_string()));
        }

        let request = self
            .http
            .get(format!("{}/chat/threads/{}/interactions", self.base_url, thread_id))
            .query(&query);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("key", "secret");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.token, credential_token("key", "secret"));
    }

    #[test]
    fn test_client_custom_base_url_strips_slash() {
        let client = ApiClient::with_base_url("key", "secret", "https://custom.api.com/v1/");
        assert_eq!(client.base_url(), "https://custom.api.com/v1");
    }

    #[test]
    fn test_credential_token() {
        // "key:secret"
        assert_eq!(credential_token("key", "secret"), "a2V5OnNlY3JldA==");
        assert_eq!(
            ApiClient::new("key", "secret").authorization(),
            "Bearer a2V5OnNlY3JldA=="
        );
    }
}
