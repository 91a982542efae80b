//! Invocation orchestrator
//!
//! The stateful driver of a call: resolves the effective service, builds
//! headers and body, issues the network call under the timeout guard, and
//! normalizes the response. All failure modes converge into one
//! [`BrokerError`] per call, preceded by exactly one user-visible
//! notification.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::core::{build_headers, protocol_error, AiBroker, RequestOptions};
use crate::constants;
use crate::error::BrokerError;
use crate::format;
use crate::normalize;

impl AiBroker {
    /// Perform one provider call and return the normalized content
    ///
    /// Emits a transient notification before propagating any failure, so a
    /// caller that does not await the result still gets feedback.
    pub async fn invoke(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<String, BrokerError> {
        let result = self.invoke_inner(prompt, options).await;
        if let Err(err) = &result {
            self.notifier.notify(&format!("AI request failed: {err}"));
        }
        result
    }

    async fn invoke_inner(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<String, BrokerError> {
        // Settings are read once per call; a configuration change landing
        // mid-flight affects only subsequent calls
        let settings = self.settings.read().clone();

        let service = settings
            .resolve(options.model.as_deref())
            .ok_or(BrokerError::NotConfigured)?
            .clone();

        if !service.is_local && service.api_key.is_empty() {
            return Err(BrokerError::MissingApiKey);
        }

        // Call-level overrides win over service/global defaults
        let temperature = options.temperature.unwrap_or(settings.temperature);
        let max_tokens = options.max_tokens.unwrap_or(settings.max_tokens);
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| service.model.clone());
        let system_prompt = options
            .system_prompt
            .as_deref()
            .unwrap_or(constants::defaults::SYSTEM_PROMPT);

        let headers = build_headers(&service);
        let body = format::build_request_body(
            service.provider,
            &model,
            prompt,
            system_prompt,
            temperature,
            max_tokens,
        );

        debug!(
            provider = %service.provider,
            model = %model,
            url = %service.url,
            "dispatching AI request"
        );

        let call = self.transport.post(&service.url, &headers, &body);
        let response = match tokio::time::timeout(Duration::from_millis(settings.timeout_ms), call)
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(BrokerError::Network(e.to_string())),
            Err(_) => {
                return Err(BrokerError::Timeout(settings.timeout_ms as f64 / 1000.0));
            }
        };

        if !response.is_success() {
            return Err(protocol_error(&response));
        }

        let decoded: Value = response
            .json()
            .map_err(|e| BrokerError::Parse(format!("Failed to parse response: {e}")))?;

        let parsed = normalize::parse_response(service.provider, &decoded);
        if let Some(error) = parsed.error {
            return Err(BrokerError::Parse(error));
        }
        Ok(parsed.content)
    }
}
