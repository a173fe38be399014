//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, GatewayError};

/// Stateless chat-completion client
///
/// Each call sends exactly one request; conversation state lives with the
/// caller. Implementations never retry and never cache responses.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the normalized answer
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError>;
}
