//! Prompt templates
//!
//! Handlebars templates compiled into the binary, overridable per file from a
//! prompt directory.

mod builder;
pub mod embedded;

pub use builder::{NO_DRILLDOWN, NO_README, NO_SEARCH, PromptBuilder, PromptError};
