//! Network transport seam
//!
//! The orchestrator performs exactly one POST per invocation through this
//! trait. Production uses reqwest; tests substitute stub transports (e.g.
//! one that never resolves, to exercise the timeout guard).

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::error;

use crate::constants;

/// Decoded-enough HTTP response: status plus raw body text
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// One-shot JSON POST primitive
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, headers: &[(String, String)], body: &Value)
        -> Result<HttpResponse>;
}

/// Production transport backed by reqwest
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        // No overall request timeout here: the orchestrator arms its own
        // per-call cancellation timer from settings
        let http = Client::builder()
            .user_agent(constants::http::USER_AGENT)
            .connect_timeout(constants::http::CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client: {}. Using default client.", e);
                Client::new()
            });
        Self { http }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<HttpResponse> {
        let mut request = self.http.post(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_json_decoding() {
        let response = HttpResponse::new(200, r#"{"ok":true}"#);
        assert_eq!(response.json().unwrap()["ok"], true);
        assert!(HttpResponse::new(200, "not json").json().is_err());
    }
}
