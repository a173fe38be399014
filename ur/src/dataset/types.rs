//! Use-case catalogue types
//!
//! Mirrors the dataset JSON: a mapping from use-case name to its technique
//! metadata and named text artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Artifact holding the detection search
pub const SEARCH_ARTIFACT: &str = "search.spl";

/// Artifact holding the drill-down search
pub const DRILLDOWN_ARTIFACT: &str = "drilldown.spl";

/// Artifact holding the use-case readme
pub const README_ARTIFACT: &str = "README.md";

/// An ATT&CK technique attached to a use case
///
/// Every field defaults to an empty string. List-valued fields (tactics and
/// platforms are often arrays in enriched datasets) are joined with ", ".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    #[serde(rename = "ID", alias = "id", default, deserialize_with = "text_field")]
    pub id: String,

    #[serde(default, deserialize_with = "text_field")]
    pub name: String,

    #[serde(default, deserialize_with = "text_field")]
    pub description: String,

    #[serde(default, deserialize_with = "text_field")]
    pub tactics: String,

    #[serde(default, deserialize_with = "text_field")]
    pub platforms: String,
}

/// A named unit of review: techniques plus artifact texts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub techniques: Vec<Technique>,

    /// Artifact name to raw text; entries may be null
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: BTreeMap<String, Option<String>>,
}

impl UseCase {
    /// Whether any technique metadata is attached
    pub fn has_techniques(&self) -> bool {
        !self.techniques.is_empty()
    }

    /// Artifact text, treating null and empty text as absent
    pub fn artifact(&self, name: &str) -> Option<&str> {
        let text = self.files.get(name).and_then(|t| t.as_deref()).filter(|t| !t.is_empty());
        debug!(%name, present = text.is_some(), "UseCase::artifact: called");
        text
    }
}

/// The loaded catalogue, ordered by use-case name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    usecases: BTreeMap<String, UseCase>,
}

impl Catalog {
    pub fn new(usecases: BTreeMap<String, UseCase>) -> Self {
        Self { usecases }
    }

    pub fn get(&self, name: &str) -> Option<&UseCase> {
        self.usecases.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.usecases.contains_key(name)
    }

    /// Use-case names in listing order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.usecases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.usecases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usecases.is_empty()
    }
}

/// A null collection reads as an empty one
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn text_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(display_value).unwrap_or_default())
}

/// Render a JSON value as display text
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technique_fields_default_to_empty() {
        let technique: Technique = serde_json::from_str("{}").unwrap();
        assert_eq!(technique, Technique::default());
    }

    #[test]
    fn test_technique_list_fields_are_joined() {
        let technique: Technique = serde_json::from_str(
            r#"{"ID": "T1003", "name": "OS Credential Dumping", "tactics": ["credential-access"],
                "platforms": ["Windows", "Linux", null], "description": null}"#,
        )
        .unwrap();

        assert_eq!(technique.id, "T1003");
        assert_eq!(technique.tactics, "credential-access");
        assert_eq!(technique.platforms, "Windows, Linux");
        assert_eq!(technique.description, "");
    }

    #[test]
    fn test_usecase_defaults_when_keys_missing() {
        let usecase: UseCase = serde_json::from_str("{}").unwrap();
        assert!(!usecase.has_techniques());
        assert!(usecase.files.is_empty());
    }

    #[test]
    fn test_usecase_null_collections_are_empty() {
        let usecase: UseCase = serde_json::from_str(r#"{"techniques": null, "files": null}"#).unwrap();
        assert!(!usecase.has_techniques());
        assert!(usecase.files.is_empty());
    }

    #[test]
    fn test_artifact_treats_null_and_empty_as_absent() {
        let usecase: UseCase = serde_json::from_str(
            r#"{"files": {"search.spl": "index=win", "drilldown.spl": null, "README.md": ""}}"#,
        )
        .unwrap();

        assert_eq!(usecase.artifact(SEARCH_ARTIFACT), Some("index=win"));
        assert_eq!(usecase.artifact(DRILLDOWN_ARTIFACT), None);
        assert_eq!(usecase.artifact(README_ARTIFACT), None);
        assert_eq!(usecase.artifact("other"), None);
    }

    #[test]
    fn test_catalog_names_are_sorted() {
        let catalog: Catalog = serde_json::from_str(r#"{"b": {}, "a": {}, "c": {}}"#).unwrap();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains("b"));
    }
}
