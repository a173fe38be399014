//! Core ReviewStore implementation

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::{ANALYSES_FILE, LOCK_FILE, REVIEWED_FILE};

/// Identifier of a use case (its name in the dataset)
pub type UseCaseId = String;

/// A saved analysis for one use case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Rendered transcript plus the optional final review
    pub analysis: String,
    /// ISO-8601 save time
    pub timestamp: String,
}

impl ReviewRecord {
    /// Create a record stamped with the current local time
    pub fn new(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            timestamp: Local::now().to_rfc3339(),
        }
    }

    /// Parse the timestamp, if it carries an offset
    ///
    /// Records written by older tooling may hold naive timestamps; those
    /// return `None` and are kept verbatim.
    pub fn saved_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

/// File-backed review store
///
/// Single-writer: the advisory lock only coordinates processes that go
/// through this type.
pub struct ReviewStore {
    base_path: PathBuf,
}

/// Held for the duration of a read-modify-write cycle
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl ReviewStore {
    /// Open or create a review store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| StoreError::io(&base_path, e))?;
        debug!("Opened review store at {}", base_path.display());
        Ok(Self { base_path })
    }

    /// Directory holding the store files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn reviewed_path(&self) -> PathBuf {
        self.base_path.join(REVIEWED_FILE)
    }

    fn analyses_path(&self) -> PathBuf {
        self.base_path.join(ANALYSES_FILE)
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        let path = self.base_path.join(LOCK_FILE);
        let file = File::create(&path).map_err(|e| StoreError::io(&path, e))?;
        FileExt::lock_exclusive(&file).map_err(|e| StoreError::io(&path, e))?;
        debug!("lock: acquired {}", path.display());
        Ok(StoreLock { file })
    }

    /// Load the set of reviewed use cases (empty when the file does not exist)
    pub fn load_reviewed(&self) -> Result<BTreeSet<UseCaseId>, StoreError> {
        let list: Vec<UseCaseId> = read_json(&self.reviewed_path())?;
        Ok(list.into_iter().collect())
    }

    /// Overwrite the reviewed set
    pub fn save_reviewed(&self, reviewed: &BTreeSet<UseCaseId>) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        self.write_reviewed(reviewed)
    }

    fn write_reviewed(&self, reviewed: &BTreeSet<UseCaseId>) -> Result<(), StoreError> {
        debug!("write_reviewed: {} use cases", reviewed.len());
        let list: Vec<&UseCaseId> = reviewed.iter().collect();
        write_json_atomic(&self.reviewed_path(), &list, false)
    }

    /// Check whether a use case is in the reviewed set
    pub fn is_reviewed(&self, usecase_id: &str) -> Result<bool, StoreError> {
        Ok(self.load_reviewed()?.contains(usecase_id))
    }

    /// Add a use case to the reviewed set; returns false if it was already there
    pub fn mark_reviewed(&self, usecase_id: &str) -> Result<bool, StoreError> {
        let _lock = self.lock()?;
        let mut reviewed = self.load_reviewed()?;
        let inserted = reviewed.insert(usecase_id.to_string());
        if inserted {
            self.write_reviewed(&reviewed)?;
        }
        Ok(inserted)
    }

    /// Remove a use case from the reviewed set; returns false if it was absent
    pub fn unmark_reviewed(&self, usecase_id: &str) -> Result<bool, StoreError> {
        let _lock = self.lock()?;
        let mut reviewed = self.load_reviewed()?;
        let removed = reviewed.remove(usecase_id);
        if removed {
            self.write_reviewed(&reviewed)?;
        }
        Ok(removed)
    }

    /// Upsert the record for a use case (last write wins)
    pub fn save_record(&self, usecase_id: &str, text: &str) -> Result<ReviewRecord, StoreError> {
        let _lock = self.lock()?;
        self.upsert_record(usecase_id, text)
    }

    fn upsert_record(&self, usecase_id: &str, text: &str) -> Result<ReviewRecord, StoreError> {
        debug!("upsert_record: {} ({} bytes)", usecase_id, text.len());
        let mut records = self.records()?;
        let record = ReviewRecord::new(text);
        if records.insert(usecase_id.to_string(), record.clone()).is_some() {
            debug!("upsert_record: replacing existing record for {}", usecase_id);
        }
        write_json_atomic(&self.analyses_path(), &records, true)?;
        Ok(record)
    }

    /// Get the saved record for a use case
    pub fn get_record(&self, usecase_id: &str) -> Result<Option<ReviewRecord>, StoreError> {
        Ok(self.records()?.remove(usecase_id))
    }

    /// All saved records, ordered by use-case id
    pub fn records(&self) -> Result<BTreeMap<UseCaseId, ReviewRecord>, StoreError> {
        read_json(&self.analyses_path())
    }

    /// Save a record and mark the use case reviewed
    ///
    /// The record is written before the reviewed set, each with an atomic
    /// rename, so an interrupted commit can leave a record without its mark
    /// but never a mark without a record.
    pub fn commit_review(&self, usecase_id: &str, text: &str) -> Result<ReviewRecord, StoreError> {
        let _lock = self.lock()?;
        let record = self.upsert_record(usecase_id, text)?;

        let mut reviewed = self.load_reviewed()?;
        if reviewed.insert(usecase_id.to_string()) {
            self.write_reviewed(&reviewed)?;
        }

        info!("Committed review for {}", usecase_id);
        Ok(record)
    }
}

/// Read a JSON file, treating a missing or empty file as the default value
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("read_json: {} missing, using default", path.display());
            return Ok(T::default());
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if content.trim().is_empty() {
        warn!("read_json: {} is empty, using default", path.display());
        return Ok(T::default());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Write JSON to a temp file beside `path`, then rename over it
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let body = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(body.as_bytes()).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

    debug!("write_json_atomic: persisted {} ({} bytes)", path.display(), body.len());
    Ok(())
}
