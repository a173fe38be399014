//! Gateway error types

use thiserror::Error;

/// Errors from a call to the serving endpoint
///
/// The gateway makes a single attempt; transient and permanent failures are
/// reported the same way for display.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            GatewayError::Network(e) => e.status().map(|s| s.as_u16()),
            GatewayError::InvalidRequest(_) => None,
        }
    }

    /// Response body, or the failure description when there is none
    pub fn body(&self) -> String {
        match self {
            GatewayError::Api { body, .. } => body.clone(),
            GatewayError::Network(e) => e.to_string(),
            GatewayError::InvalidRequest(msg) => msg.clone(),
        }
    }
}
