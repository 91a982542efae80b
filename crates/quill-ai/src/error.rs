//! Broker error taxonomy
//!
//! Every failure mode of an invocation converges into one error channel.
//! Configuration errors are raised before any network attempt; transport,
//! protocol, and normalization errors after.

use thiserror::Error;

/// All failure modes of a single invocation
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No active service could be resolved from the registry
    #[error("AI Interface is not properly configured")]
    NotConfigured,

    /// The resolved service is not local and has no API key
    #[error("API key is required for this service")]
    MissingApiKey,

    /// The cancellation timer fired before the provider answered
    #[error("Request timed out after {0} seconds")]
    Timeout(f64),

    /// Transport-level failure before any HTTP status was received
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response carrying a provider-embedded error message
    #[error("{0}")]
    Provider(String),

    /// Non-2xx response with no parseable error payload
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// Response decoded but no known shape matched
    #[error("{0}")]
    Parse(String),
}

impl BrokerError {
    /// True for errors the caller can fix by changing configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::MissingApiKey)
    }
}
