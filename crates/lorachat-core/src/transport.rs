//! HTTP exchange with the question-answering endpoint

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest slice of an error body kept for the log
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Malformed(String),
}

/// A single request/response exchange with the answering service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, query: &str) -> Result<String, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build a client for `endpoint`. Without a timeout a hung request stays
    /// pending until the connection closes.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, query: &str) -> Result<String, TransportError> {
        let network = |source| TransportError::Network {
            endpoint: self.endpoint.clone(),
            source,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { query })
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let body = response.text().await.map_err(network)?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Malformed(e.to_string()))?;
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_has_query_field() {
        let json = serde_json::to_value(ChatRequest { query: "hi" }).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "hi" }));
    }

    #[test]
    fn response_without_answer_field_is_rejected() {
        let parsed = serde_json::from_str::<ChatResponse>(r#"{"detail":"boom"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn status_error_mentions_code() {
        let err = TransportError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "endpoint returned HTTP 502: bad gateway");
    }
}
