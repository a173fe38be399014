//! Prompt Builder
//!
//! Renders a use case into the review prompt, plus the system messages used
//! for the initial analysis and for follow-up questions.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use super::embedded;
use crate::dataset::{DRILLDOWN_ARTIFACT, README_ARTIFACT, SEARCH_ARTIFACT, UseCase};

/// Shown when the use case has no search artifact
pub const NO_SEARCH: &str = "No SPL available";

/// Shown when the use case has no drill-down artifact
pub const NO_DRILLDOWN: &str = "No drill down query available";

/// Shown when the use case has no readme
pub const NO_README: &str = "No README available";

/// Errors loading or rendering prompt templates
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompt template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid prompt template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("Failed to render prompt: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// One technique, numbered for display
#[derive(Debug, Serialize)]
struct TechniqueContext<'a> {
    number: usize,
    id: &'a str,
    name: &'a str,
    description: &'a str,
    tactics: &'a str,
    platforms: &'a str,
}

/// Context for the review template
#[derive(Debug, Serialize)]
struct ReviewContext<'a> {
    techniques: Vec<TechniqueContext<'a>>,
    search: &'a str,
    drilldown: &'a str,
    readme: &'a str,
}

impl<'a> ReviewContext<'a> {
    fn from_usecase(usecase: &'a UseCase) -> Self {
        let techniques = usecase
            .techniques
            .iter()
            .enumerate()
            .map(|(idx, t)| TechniqueContext {
                number: idx + 1,
                id: &t.id,
                name: &t.name,
                description: &t.description,
                tactics: &t.tactics,
                platforms: &t.platforms,
            })
            .collect();

        Self {
            techniques,
            search: usecase.artifact(SEARCH_ARTIFACT).unwrap_or(NO_SEARCH),
            drilldown: usecase.artifact(DRILLDOWN_ARTIFACT).unwrap_or(NO_DRILLDOWN),
            readme: usecase.artifact(README_ARTIFACT).unwrap_or(NO_README),
        }
    }
}

/// Compiles prompt templates once and renders them on demand
///
/// Rendering is deterministic: the same use case always yields the same text.
pub struct PromptBuilder {
    hbs: Handlebars<'static>,
}

impl PromptBuilder {
    /// Create a builder, preferring `{prompt_dir}/{name}.pmt` over the embedded templates
    pub fn new(prompt_dir: Option<&Path>) -> Result<Self, PromptError> {
        debug!(?prompt_dir, "PromptBuilder::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        for (name, fallback) in embedded::TEMPLATES {
            let template = load_template(prompt_dir, name, fallback)?;
            hbs.register_template_string(name, template)
                .map_err(|source| PromptError::Template {
                    name: name.to_string(),
                    source: Box::new(source),
                })?;
        }

        Ok(Self { hbs })
    }

    /// Create a builder that only uses embedded prompts
    pub fn embedded() -> Result<Self, PromptError> {
        Self::new(None)
    }

    /// Render the review prompt for a use case
    pub fn build(&self, usecase: &UseCase) -> Result<String, PromptError> {
        debug!(technique_count = usecase.techniques.len(), "PromptBuilder::build: called");
        self.render("review", &ReviewContext::from_usecase(usecase))
    }

    /// System message for the initial analysis
    pub fn analysis_system_prompt(&self) -> Result<String, PromptError> {
        self.render("system", &json!({}))
    }

    /// System message for follow-ups, carrying the initial analysis as context
    pub fn followup_system_prompt(&self, initial_analysis: &str) -> Result<String, PromptError> {
        debug!(analysis_len = initial_analysis.len(), "PromptBuilder::followup_system_prompt: called");
        self.render("followup", &json!({ "analysis": initial_analysis }))
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, PromptError> {
        let rendered = self.hbs.render(name, data)?;
        Ok(rendered.trim_end().to_string())
    }
}

/// Load a template: override directory first, then the embedded copy
fn load_template(prompt_dir: Option<&Path>, name: &str, fallback: &str) -> Result<String, PromptError> {
    if let Some(dir) = prompt_dir {
        let path = dir.join(format!("{}.pmt", name));
        if path.exists() {
            info!("Using prompt override {}", path.display());
            return std::fs::read_to_string(&path).map_err(|source| PromptError::Io { path, source });
        }
        debug!(?path, "load_template: no override");
    }

    Ok(fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Technique;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn technique(id: &str, name: &str) -> Technique {
        Technique {
            id: id.to_string(),
            name: name.to_string(),
            description: "desc".to_string(),
            tactics: "credential-access".to_string(),
            platforms: "Windows".to_string(),
        }
    }

    fn usecase_with_files(files: &[(&str, &str)]) -> UseCase {
        UseCase {
            techniques: vec![technique("T1003", "OS Credential Dumping")],
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_fallbacks_for_missing_files() {
        let builder = PromptBuilder::embedded().unwrap();
        let prompt = builder.build(&usecase_with_files(&[])).unwrap();

        assert!(prompt.contains(NO_SEARCH));
        assert!(prompt.contains(NO_DRILLDOWN));
        assert!(prompt.contains(NO_README));
    }

    #[test]
    fn test_renders_exact_layout() {
        let builder = PromptBuilder::embedded().unwrap();
        let usecase = usecase_with_files(&[
            (SEARCH_ARTIFACT, "index=win EventCode=10"),
            (README_ARTIFACT, "Reads lsass"),
        ]);

        let prompt = builder.build(&usecase).unwrap();

        let expected = "You are a security-focused assistant. Review the following SPL against each MITRE technique and describe any coverage gaps.\n\n\
### Technique 1\n\
ID: T1003\n\
Name: OS Credential Dumping\n\
Description: desc\n\
Tactics: credential-access\n\
Platforms: Windows\n\n\
### SPL Query\nindex=win EventCode=10\n\n\
### Drill-down SPL Query\nNo drill down query available\n\n\
### README Context\nReads lsass\n\n\
Please analyze and for each technique:\n\
1. What is not covered by the SPL query for detecting this technique?\n\
2. Identify any mistakes or gaps.\n\
3. Suggest specific changes needed.\n\
4. Provide recommendations for improving detection coverage.";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_techniques_are_one_indexed() {
        let builder = PromptBuilder::embedded().unwrap();
        let mut usecase = usecase_with_files(&[]);
        usecase.techniques.push(technique("T1059", "Command and Scripting Interpreter"));

        let prompt = builder.build(&usecase).unwrap();
        let first = prompt.find("### Technique 1").unwrap();
        let second = prompt.find("### Technique 2").unwrap();
        assert!(first < second);
        assert!(!prompt.contains("### Technique 0"));
    }

    #[test]
    fn test_artifact_text_is_not_escaped() {
        let builder = PromptBuilder::embedded().unwrap();
        let usecase = usecase_with_files(&[(SEARCH_ARTIFACT, "| where count > 5 & user != \"svc\" {{x}}")]);

        let prompt = builder.build(&usecase).unwrap();
        assert!(prompt.contains("| where count > 5 & user != \"svc\" {{x}}"));
    }

    #[test]
    fn test_followup_system_prompt_embeds_analysis() {
        let builder = PromptBuilder::embedded().unwrap();
        let system = builder.followup_system_prompt("Gap: no lsass access").unwrap();

        assert!(system.starts_with(&builder.analysis_system_prompt().unwrap()));
        assert!(system.ends_with("Original analysis: Gap: no lsass access"));
    }

    #[test]
    fn test_override_directory_wins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("system.pmt"), "Custom system prompt\n").unwrap();

        let builder = PromptBuilder::new(Some(temp.path())).unwrap();
        assert_eq!(builder.analysis_system_prompt().unwrap(), "Custom system prompt");

        // Templates without an override fall back to the embedded copy
        assert!(builder.build(&usecase_with_files(&[])).unwrap().contains(NO_README));
    }

    proptest::proptest! {
        #[test]
        fn prop_build_is_deterministic(search in ".{0,80}", readme in proptest::option::of(".{0,80}")) {
            let builder = PromptBuilder::embedded().unwrap();
            let mut usecase = usecase_with_files(&[(SEARCH_ARTIFACT, search.as_str())]);
            usecase.files.insert(README_ARTIFACT.to_string(), readme);

            let first = builder.build(&usecase).unwrap();
            let second = builder.build(&usecase).unwrap();
            proptest::prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("review.pmt"), "{{#each techniques}}").unwrap();

        let err = PromptBuilder::new(Some(temp.path())).err().unwrap();
        assert!(matches!(err, PromptError::Template { ref name, .. } if name == "review"));
    }
}
