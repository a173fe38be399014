//! LLM gateway
//!
//! Sends chat-completion requests to a Databricks serving endpoint and
//! normalizes whatever response shape comes back into plain text.

use std::sync::Arc;

use tracing::{debug, info};

pub mod client;
mod databricks;
mod error;
mod response;
mod types;

pub use client::LlmClient;
pub use databricks::{DatabricksClient, invocations_url};
pub use error::GatewayError;
pub use response::{normalize, parse_body};
pub use types::{CompletionOptions, CompletionRequest, CompletionResponse, Message, ResponseShape, Role};

use crate::config::{GatewayConfig, LlmConfig};

/// Create the serving-endpoint client from config
///
/// Credentials are resolved from the environment first, so a missing host or
/// token fails here without touching the network.
pub fn create_client(config: &LlmConfig) -> eyre::Result<Arc<dyn LlmClient>> {
    debug!(endpoint = %config.endpoint, "create_client: called");
    let resolved = config.resolve()?;
    Ok(create_client_from_resolved(&resolved)?)
}

/// Create the serving-endpoint client from an already resolved configuration
pub fn create_client_from_resolved(config: &GatewayConfig) -> Result<Arc<dyn LlmClient>, GatewayError> {
    debug!(?config, "create_client_from_resolved: called");
    let client = DatabricksClient::from_config(config)?;
    info!(url = %client.url(), "Created serving-endpoint client");
    Ok(Arc::new(client))
}
