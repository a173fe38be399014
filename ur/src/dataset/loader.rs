//! Dataset loading with a per-path cache

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::Catalog;

/// The dataset could not be read or parsed
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },
}

/// Read and parse a dataset file (uncached)
pub fn load(path: impl AsRef<Path>) -> Result<Catalog, DatasetError> {
    let path = path.as_ref();
    debug!(?path, "load: called");

    let unavailable = |reason: String| DatasetError::DataUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    let catalog: Catalog = serde_json::from_str(&content).map_err(|e| unavailable(e.to_string()))?;

    info!("Loaded {} use cases from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Loads catalogues once per source path
///
/// The dataset is static for the life of the process, so entries are never
/// invalidated. Failed loads are not cached.
#[derive(Debug, Default)]
pub struct DatasetLoader {
    cache: Mutex<HashMap<PathBuf, Arc<Catalog>>>,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the catalogue at `path`, reusing a cached copy when present
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Catalog>, DatasetError> {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        if let Some(cached) = self.cache().get(&key) {
            debug!(?key, "DatasetLoader::load: cache hit");
            return Ok(Arc::clone(cached));
        }

        debug!(?key, "DatasetLoader::load: cache miss");
        let catalog = Arc::new(load(path)?);
        self.cache().insert(key, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Load the catalogue, degrading to an empty one on failure
    pub fn load_or_empty(&self, path: impl AsRef<Path>) -> Arc<Catalog> {
        match self.load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("{}; continuing with an empty catalogue", e);
                Arc::new(Catalog::default())
            }
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<Catalog>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
