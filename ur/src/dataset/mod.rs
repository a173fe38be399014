//! Use-case dataset
//!
//! Loads the static catalogue of use cases the reviewer walks through.

mod loader;
mod types;

pub use loader::{DatasetError, DatasetLoader, load};
pub use types::{Catalog, DRILLDOWN_ARTIFACT, README_ARTIFACT, SEARCH_ARTIFACT, Technique, UseCase};
