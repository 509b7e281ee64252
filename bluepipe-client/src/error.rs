//! Error types for the Bluepipe client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Bluepipe client
///
/// Server-reported failures and non-2xx responses are not errors: they come
/// back as an [`ApiResponse`](crate::ApiResponse) with `success == false`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout, or a broken response stream
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The configured endpoint is not an absolute http(s) URL
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint as supplied
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// A request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// Create an invalid endpoint error
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(err) if err.is_timeout())
    }

    /// Check if this error is a network-level failure
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
