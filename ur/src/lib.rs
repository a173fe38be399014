//! Use-case review - LLM-assisted review of detection use cases
//!
//! A reviewer picks a use case from a static catalogue, sends its techniques
//! and SPL artifacts to a Databricks serving endpoint for a gap analysis, asks
//! follow-up questions, and saves the transcript as a review record.
//!
//! # Modules
//!
//! - [`dataset`] - Use-case catalogue loading
//! - [`prompts`] - Review and system prompt templates
//! - [`llm`] - Serving-endpoint client and response normalization
//! - [`conversation`] - Per-use-case transcript
//! - [`session`] - One reviewer's session state
//! - [`repl`] - Interactive REPL
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod conversation;
pub mod dataset;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod session;

pub use config::{Config, ConfigError, GatewayConfig, LlmConfig};
pub use conversation::{ConversationError, ConversationState};
pub use dataset::{Catalog, DatasetError, DatasetLoader, Technique, UseCase};
pub use llm::{CompletionOptions, GatewayError, LlmClient, ResponseShape};
pub use prompts::{PromptBuilder, PromptError};
pub use session::{Session, SessionError, UseCaseEntry};
