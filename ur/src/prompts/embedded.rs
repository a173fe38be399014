//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

/// Initial review prompt for one use case
pub const REVIEW: &str = include_str!("../../prompts/review.pmt");

/// System message for the initial analysis
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// System message for follow-up questions, embedding the initial analysis
pub const FOLLOWUP: &str = include_str!("../../prompts/followup.pmt");

/// All embedded templates by name
pub const TEMPLATES: [(&str, &str); 3] = [("review", REVIEW), ("system", SYSTEM), ("followup", FOLLOWUP)];
