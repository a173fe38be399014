//! Review session
//!
//! Everything one reviewer works with: the catalogue, the current
//! conversation, the reviewed set and the collaborators that talk to the
//! serving endpoint and the store. Every mutating call takes `&mut self`, so a
//! conversation never has two gateway calls in flight.

use std::collections::BTreeSet;
use std::sync::Arc;

use reviewstore::{ReviewRecord, ReviewStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::conversation::{ConversationError, ConversationState};
use crate::dataset::{Catalog, DatasetLoader, UseCase};
use crate::llm::{CompletionOptions, CompletionRequest, GatewayError, LlmClient, Message};
use crate::prompts::{PromptBuilder, PromptError};

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No use case selected")]
    NoSelection,

    #[error("Unknown use case: {0}")]
    UnknownUseCase(String),

    #[error("No technique data available.")]
    NoTechniqueData(String),

    #[error("Nothing to save; analyze the use case first")]
    NothingToSave,

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A use case as listed to the reviewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseCaseEntry {
    pub name: String,
    pub reviewed: bool,
}

pub struct Session {
    catalog: Arc<Catalog>,
    conversation: ConversationState,
    reviewed: BTreeSet<String>,
    store: ReviewStore,
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    options: CompletionOptions,
}

impl Session {
    /// Create a session, loading the reviewed set from the store
    ///
    /// An unreadable reviewed set starts the session with no marks; the store
    /// still refuses to write over the damaged file.
    pub fn new(
        catalog: Arc<Catalog>,
        store: ReviewStore,
        llm: Arc<dyn LlmClient>,
        prompts: PromptBuilder,
        options: CompletionOptions,
    ) -> Self {
        debug!(usecases = catalog.len(), "Session::new: called");
        let reviewed = load_reviewed_or_empty(&store);
        info!(usecases = catalog.len(), reviewed = reviewed.len(), "Session started");

        Self {
            catalog,
            conversation: ConversationState::new(),
            reviewed,
            store,
            llm,
            prompts,
            options,
        }
    }

    /// Build a session from config; an unreadable dataset yields an empty catalogue
    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>) -> Result<Self, SessionError> {
        debug!(dataset = ?config.data.dataset, "Session::from_config: called");
        let catalog = DatasetLoader::new().load_or_empty(&config.data.dataset);
        let store = ReviewStore::open(&config.data.store_dir)?;
        let prompts = PromptBuilder::new(config.data.prompt_dir.as_deref())?;
        Ok(Self::new(catalog, store, llm, prompts, CompletionOptions::from(&config.llm)))
    }

    /// All use cases in listing order, with their reviewed mark
    pub fn usecases(&self) -> Vec<UseCaseEntry> {
        self.catalog
            .names()
            .map(|name| UseCaseEntry {
                name: name.to_string(),
                reviewed: self.reviewed.contains(name),
            })
            .collect()
    }

    /// Make a use case current; switching discards the transcript
    pub fn select(&mut self, name: &str) -> Result<&UseCase, SessionError> {
        debug!(%name, "Session::select: called");
        let usecase = self
            .catalog
            .get(name)
            .ok_or_else(|| SessionError::UnknownUseCase(name.to_string()))?;
        if self.conversation.select(name) {
            info!(%name, "Selected use case");
        }
        Ok(usecase)
    }

    /// The selected use case, if any
    pub fn selected(&self) -> Option<(&str, &UseCase)> {
        let name = self.conversation.active_usecase()?;
        self.catalog.get(name).map(|u| (name, u))
    }

    /// Rendered review prompt for the selected use case
    pub fn default_prompt(&self) -> Result<String, SessionError> {
        let (_, usecase) = self.selected().ok_or(SessionError::NoSelection)?;
        Ok(self.prompts.build(usecase)?)
    }

    /// Run the initial analysis for the selected use case
    ///
    /// A use case without technique data is rejected before any request is
    /// sent. A blank `prompt` falls back to the default prompt.
    pub async fn analyze(&mut self, prompt: Option<String>) -> Result<String, SessionError> {
        debug!(custom_prompt = prompt.is_some(), "Session::analyze: called");
        let (name, usecase) = self.selected().ok_or(SessionError::NoSelection)?;
        if !usecase.has_techniques() {
            debug!(%name, "Session::analyze: no technique data");
            return Err(SessionError::NoTechniqueData(name.to_string()));
        }

        let user_prompt = match prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => self.prompts.build(usecase)?,
        };
        let messages = vec![
            Message::system(self.prompts.analysis_system_prompt()?),
            Message::user(user_prompt),
        ];

        let response = self.llm.complete(CompletionRequest::new(messages, &self.options)).await?;
        info!(content_len = response.content.len(), "Initial analysis received");

        self.conversation.record_initial(&response.content);
        Ok(response.content)
    }

    /// Ask a follow-up question about the current analysis
    pub async fn followup(&mut self, question: &str) -> Result<String, SessionError> {
        debug!("Session::followup: called");
        let answer = self
            .conversation
            .append_followup(question, self.llm.as_ref(), &self.prompts, &self.options)
            .await?;
        Ok(answer)
    }

    /// Persist the transcript (plus an optional final review) and mark the use case reviewed
    pub fn save(&mut self, final_review: Option<&str>) -> Result<ReviewRecord, SessionError> {
        debug!(has_review = final_review.is_some(), "Session::save: called");
        let name = match self.conversation.active_usecase() {
            Some(name) if self.conversation.has_result() => name.to_string(),
            _ => return Err(SessionError::NothingToSave),
        };

        let mut text = self.conversation.render_transcript();
        if let Some(review) = final_review.map(str::trim).filter(|r| !r.is_empty()) {
            text.push_str("\n\nFinal Review:\n");
            text.push_str(review);
        }

        let record = self.store.commit_review(&name, &text)?;
        self.reviewed.insert(name.clone());
        info!(%name, "Saved review");

        self.clear();
        Ok(record)
    }

    /// Discard the transcript, keeping the selection
    pub fn clear(&mut self) {
        debug!("Session::clear: called");
        let active = self.conversation.active_usecase().map(str::to_string);
        self.conversation.reset();
        if let Some(name) = active {
            self.conversation.select(&name);
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn is_reviewed(&self, name: &str) -> bool {
        self.reviewed.contains(name)
    }
}

/// Reviewed set from the store, degrading to empty when it cannot be read
pub fn load_reviewed_or_empty(store: &ReviewStore) -> BTreeSet<String> {
    match store.load_reviewed() {
        Ok(reviewed) => reviewed,
        Err(e) => {
            warn!("{}; continuing without reviewed marks", e);
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Technique;
    use crate::llm::client::mock::MockLlmClient;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn catalog() -> Arc<Catalog> {
        let mut usecases = BTreeMap::new();
        usecases.insert("T1003".to_string(), UseCase::default());
        usecases.insert(
            "Credential Dumping".to_string(),
            UseCase {
                techniques: vec![Technique {
                    id: "T1003".to_string(),
                    name: "OS Credential Dumping".to_string(),
                    ..Default::default()
                }],
                files: BTreeMap::new(),
            },
        );
        Arc::new(Catalog::new(usecases))
    }

    fn session(temp: &TempDir, llm: Arc<MockLlmClient>) -> Session {
        Session::new(
            catalog(),
            ReviewStore::open(temp.path()).unwrap(),
            llm,
            PromptBuilder::embedded().unwrap(),
            CompletionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_no_technique_data_skips_gateway() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::replying(&["unused"]));
        let mut session = session(&temp, llm.clone());

        session.select("T1003").unwrap();
        let err = session.analyze(None).await.unwrap_err();

        assert!(matches!(err, SessionError::NoTechniqueData(ref n) if n == "T1003"));
        assert_eq!(err.to_string(), "No technique data available.");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_sends_system_and_default_prompt() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::replying(&["Gaps found"]));
        let mut session = session(&temp, llm.clone());

        session.select("Credential Dumping").unwrap();
        let expected_prompt = session.default_prompt().unwrap();
        let analysis = session.analyze(Some("   ".to_string())).await.unwrap();

        assert_eq!(analysis, "Gaps found");
        let request = &llm.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].content, expected_prompt);
        assert_eq!(session.conversation().initial_analysis(), Some("Gaps found"));
    }

    #[tokio::test]
    async fn test_select_unknown() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp, Arc::new(MockLlmClient::new(vec![])));

        assert!(matches!(
            session.select("nope").unwrap_err(),
            SessionError::UnknownUseCase(_)
        ));
        assert!(matches!(session.default_prompt().unwrap_err(), SessionError::NoSelection));
    }

    #[tokio::test]
    async fn test_corrupt_reviewed_set_does_not_block_startup() {
        let temp = TempDir::new().unwrap();
        let reviewed_path = temp.path().join(reviewstore::REVIEWED_FILE);
        std::fs::write(&reviewed_path, "not json").unwrap();

        let llm = Arc::new(MockLlmClient::replying(&["Gaps found"]));
        let mut session = session(&temp, llm);
        assert!(session.usecases().iter().all(|e| !e.reviewed));

        // Saving refuses to overwrite the damaged file
        session.select("Credential Dumping").unwrap();
        session.analyze(None).await.unwrap();
        assert!(matches!(session.save(None).unwrap_err(), SessionError::Store(_)));
        assert_eq!(std::fs::read_to_string(&reviewed_path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn test_save_requires_result() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp, Arc::new(MockLlmClient::new(vec![])));
        session.select("Credential Dumping").unwrap();

        assert!(matches!(session.save(None).unwrap_err(), SessionError::NothingToSave));
    }

    #[tokio::test]
    async fn test_save_appends_final_review_and_marks_reviewed() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::replying(&["Gaps found"]));
        let mut session = session(&temp, llm);

        session.select("Credential Dumping").unwrap();
        session.analyze(None).await.unwrap();
        let record = session.save(Some("Needs lsass coverage")).unwrap();

        assert_eq!(record.analysis, "Assistant: Gaps found\n\nFinal Review:\nNeeds lsass coverage");
        assert!(session.is_reviewed("Credential Dumping"));
        assert!(!session.conversation().has_result());
        assert_eq!(session.selected().map(|(n, _)| n), Some("Credential Dumping"));

        let entries = session.usecases();
        assert_eq!(
            entries,
            vec![
                UseCaseEntry {
                    name: "Credential Dumping".to_string(),
                    reviewed: true
                },
                UseCaseEntry {
                    name: "T1003".to_string(),
                    reviewed: false
                },
            ]
        );
    }
}
