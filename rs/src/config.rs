//! Configuration for reviewstore

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Directory holding the review files
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path)
                .context(format!("Failed to load config from {}", config_path.display()));
        }

        // Try default locations
        let default_paths = [
            Some(PathBuf::from("reviewstore.yml")),
            dirs::config_dir().map(|p| p.join("usecase-review").join("reviewstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_store_dir_is_cwd() {
        assert_eq!(Config::default().store_dir, PathBuf::from("."));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rs.yml");
        std::fs::write(&path, "store-dir: /var/lib/reviews\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/reviews"));
    }

    #[test]
    fn test_empty_mapping_keeps_default_store_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rs.yml");
        std::fs::write(&path, "{}\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("."));
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/reviewstore.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
