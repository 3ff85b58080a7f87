//! HTTP transport for webhook attempts.
//!
//! The dispatcher talks to [`WebhookTransport`] so tests can substitute a
//! scripted transport. [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use folio_core::webhooks::RESPONSE_SNIPPET_MAX_BYTES;
use reqwest::header::CONTENT_TYPE;

use super::webhook::WebhookError;

/// One signed POST, fully prepared by the dispatcher.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    /// The exact bytes that were signed.
    pub body: Vec<u8>,
    pub headers: Vec<(&'static str, String)>,
}

/// What came back from the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a single webhook request.
///
/// Any HTTP response, including 4xx/5xx, is `Ok`. `Err` is reserved for
/// requests that got no response (timeout, DNS, connection refused) and is
/// always [`WebhookError::Transient`].
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, WebhookError>;
}

/// Production transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, timeout }
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, WebhookError> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                WebhookError::Transient(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                WebhookError::Transient(format!("request failed: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let body = read_prefix(response, RESPONSE_SNIPPET_MAX_BYTES).await;
        Ok(TransportResponse { status, body })
    }
}

/// Read at most `limit` bytes of the response body, plus a few more so a
/// multi-byte character at the edge survives, then drop the connection.
///
/// A body that cannot be read does not change the outcome, so read errors
/// keep whatever arrived before them.
async fn read_prefix(mut response: reqwest::Response, limit: usize) -> String {
    let cap = limit + 3;
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < cap {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(cap - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read webhook response body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
