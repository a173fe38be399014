//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::LlmConfig;

/// Use-case review - LLM-assisted review of detection use cases
#[derive(Parser)]
#[command(
    name = "ur",
    about = "Review detection use cases against MITRE ATT&CK techniques with an LLM",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to the REPL)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the interactive review REPL
    Repl,

    /// List use cases with their reviewed mark
    List,

    /// Print the generated review prompt for a use case
    Prompt {
        /// Use-case name
        usecase: String,
    },

    /// Run the initial analysis for a use case and print it
    Analyze {
        /// Use-case name
        usecase: String,

        /// Send this file's contents instead of the generated prompt
        #[arg(short, long)]
        prompt_file: Option<PathBuf>,

        /// Save the analysis and mark the use case reviewed
        #[arg(short, long)]
        save: bool,

        /// Final review text appended when saving (implies --save)
        #[arg(short, long)]
        review: Option<String>,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("usecase-review")
        .join("logs")
        .join("ur.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with credential status and log location
///
/// Variable names come from `llm`; help is rendered before `--config` is
/// parsed, so callers pass the config found by the default lookup.
pub fn generate_after_help(llm: &LlmConfig) -> String {
    debug!(host_env = %llm.host_env, token_env = %llm.token_env, "generate_after_help: called");

    let mut help = String::new();
    help.push_str("Credentials (variable names from llm.host-env / llm.token-env):\n");
    for var in [&llm.host_env, &llm.token_env] {
        let set = std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false);
        let icon = if set { "\u{2705}" } else { "\u{274C}" };
        help.push_str(&format!("  {} {}\n", icon, var));
    }

    help.push_str(&format!("\nLogs are written to: {}\n", get_log_path().display()));
    help
}
