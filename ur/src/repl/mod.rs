//! Interactive review REPL
//!
//! Line-edited prompt with slash commands; plain input is a follow-up
//! question on the current analysis.

mod session;

pub use session::{ReplSession, SlashCommand, parse_slash_command};

use eyre::Result;

use crate::config::Config;
use crate::llm;
use crate::session::Session;

/// Run the interactive REPL
///
/// This is the main entry point for `ur repl`.
pub async fn run_interactive(config: &Config) -> Result<()> {
    // Missing credentials are fatal before anything else happens
    let llm = llm::create_client(&config.llm)?;

    let session = Session::from_config(config, llm)?;
    let mut repl = ReplSession::new(session);
    repl.run().await
}
