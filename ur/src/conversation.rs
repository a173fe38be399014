//! Per-use-case conversation transcript
//!
//! The transcript starts with the initial analysis (an assistant message) and
//! grows by question/answer pairs. Switching use case discards it.

use thiserror::Error;
use tracing::{debug, info};

use crate::llm::{CompletionOptions, CompletionRequest, GatewayError, LlmClient, Message};
use crate::prompts::{PromptBuilder, PromptError};

/// Errors from conversation operations
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Question is empty")]
    EmptyInput,

    #[error("No analysis yet; analyze the use case first")]
    NoAnalysis,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Transcript and selection state for one reviewer
#[derive(Debug, Default, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    active_usecase: Option<String>,
    has_result: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `usecase` active; returns true when this switched use case
    ///
    /// Switching clears the transcript.
    pub fn select(&mut self, usecase: &str) -> bool {
        debug!(%usecase, active = ?self.active_usecase, "ConversationState::select: called");
        if self.active_usecase.as_deref() == Some(usecase) {
            return false;
        }
        self.messages.clear();
        self.has_result = false;
        self.active_usecase = Some(usecase.to_string());
        true
    }

    /// Store the initial analysis, replacing any transcript
    ///
    /// Identical resubmission of the last entry is ignored.
    pub fn record_initial(&mut self, text: &str) {
        debug!(text_len = text.len(), "ConversationState::record_initial: called");
        if self.messages.last().is_some_and(|m| m.content == text) {
            debug!("ConversationState::record_initial: duplicate, skipping");
            return;
        }
        self.messages = vec![Message::assistant(text)];
        self.has_result = true;
    }

    /// Ask a follow-up question about the initial analysis
    ///
    /// Validation failures leave the transcript untouched. A gateway failure
    /// keeps the question in the transcript without an answer.
    pub async fn append_followup(
        &mut self,
        question: &str,
        llm: &dyn LlmClient,
        prompts: &PromptBuilder,
        options: &CompletionOptions,
    ) -> Result<String, ConversationError> {
        debug!(question_len = question.len(), "ConversationState::append_followup: called");
        let question = question.trim();
        if question.is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        let system = match self.initial_analysis() {
            Some(initial) => prompts.followup_system_prompt(initial)?,
            None => return Err(ConversationError::NoAnalysis),
        };

        self.messages.push(Message::user(question));

        let mut outbound = Vec::with_capacity(self.messages.len());
        outbound.push(Message::system(system));
        outbound.extend(self.messages.iter().skip(1).cloned());

        let response = llm.complete(CompletionRequest::new(outbound, options)).await?;
        info!(turns = self.messages.len(), "Follow-up answered");

        self.messages.push(Message::assistant(response.content.clone()));
        Ok(response.content)
    }

    /// Drop transcript and selection
    pub fn reset(&mut self) {
        debug!("ConversationState::reset: called");
        *self = Self::default();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// First transcript entry, once an analysis has been recorded
    pub fn initial_analysis(&self) -> Option<&str> {
        if !self.has_result {
            return None;
        }
        self.messages.first().map(|m| m.content.as_str())
    }

    /// Everything after the initial analysis
    pub fn followups(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or(&[])
    }

    pub fn active_usecase(&self) -> Option<&str> {
        self.active_usecase.as_deref()
    }

    pub fn has_result(&self) -> bool {
        self.has_result
    }

    /// `"{Role}: {content}"` per message, separated by blank lines
    pub fn render_transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
