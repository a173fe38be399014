//! Use-case review configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Local config file checked before the user config
const LOCAL_CONFIG: &str = ".usecase-review.yml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Serving endpoint configuration
    pub llm: LlmConfig,

    /// Dataset and store locations
    pub data: DataConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .usecase-review.yml
        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/usecase-review/usecase-review.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => [Some(PathBuf::from(LOCAL_CONFIG)), Self::user_config_path()]
                .into_iter()
                .flatten()
                .collect(),
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("usecase-review").join("usecase-review.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Serving endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Serving endpoint (model) name
    pub endpoint: String,

    /// Environment variable containing the workspace host URL
    #[serde(rename = "host-env")]
    pub host_env: String,

    /// Environment variable containing the bearer token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds (unset: transport default)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "databricks-meta-llama-3-3-70b-instruct".to_string(),
            host_env: "DATABRICKS_HOST".to_string(),
            token_env: "DATABRICKS_TOKEN".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            timeout_ms: None,
        }
    }
}

impl LlmConfig {
    /// Resolve credentials from the process environment
    pub fn resolve(&self) -> Result<GatewayConfig, ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through the given lookup
    ///
    /// Blank values count as missing.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<GatewayConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!(host_env = %self.host_env, token_env = %self.token_env, "resolve_with: called");
        let fetch = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingCredential { var: name.to_string() })
        };

        let host = fetch(&self.host_env)?;
        let token = fetch(&self.token_env)?;

        Ok(GatewayConfig {
            host: normalize_host(&host),
            token,
            endpoint: self.endpoint.clone(),
            timeout: self.timeout_ms.map(Duration::from_millis),
        })
    }
}

/// Prefix `https://` when no scheme is given and drop trailing slashes
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Fully resolved settings for the serving endpoint client
#[derive(Clone)]
pub struct GatewayConfig {
    /// Workspace base URL, scheme included, no trailing slash
    pub host: String,
    /// Bearer credential
    pub token: String,
    /// Serving endpoint name
    pub endpoint: String,
    /// Request timeout
    pub timeout: Option<Duration>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Fatal configuration problems, raised before any network call
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: set the {var} environment variable")]
    MissingCredential { var: String },
}

/// Dataset and store locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Use-case catalogue (JSON)
    pub dataset: PathBuf,

    /// Directory holding reviewed_usecases.json and usecase_analyses.json
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,

    /// Directory with prompt template overrides (*.pmt)
    #[serde(rename = "prompt-dir")]
    pub prompt_dir: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("mitre_enriched_with_files.json"),
            store_dir: PathBuf::from("."),
            prompt_dir: None,
        }
    }
}
