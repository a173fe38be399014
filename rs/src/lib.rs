//! ReviewStore - durable review records for use-case reviews
//!
//! Keeps two JSON files side by side in a store directory: the set of use
//! cases a reviewer has marked complete, and the saved analysis text for each
//! use case.
//!
//! # Layout
//!
//! ```text
//! {store_dir}/
//! ├── reviewed_usecases.json   # ["T1003", "T1059", ...]
//! ├── usecase_analyses.json    # {"T1003": {"analysis": "...", "timestamp": "..."}}
//! └── .reviewstore.lock        # advisory lock for read-modify-write cycles
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reviewstore::ReviewStore;
//!
//! let store = ReviewStore::open(".")?;
//! store.commit_review("T1003", "Assistant: looks fine")?;
//! assert!(store.is_reviewed("T1003")?);
//! ```

pub mod cli;
pub mod config;
mod error;
mod store;

pub use error::StoreError;
pub use store::{ReviewRecord, ReviewStore, UseCaseId};

/// File holding the reviewed set
pub const REVIEWED_FILE: &str = "reviewed_usecases.json";

/// File holding saved analyses
pub const ANALYSES_FILE: &str = "usecase_analyses.json";

/// Advisory lock file
pub const LOCK_FILE: &str = ".reviewstore.lock";
