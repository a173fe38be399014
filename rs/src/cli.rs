//! CLI argument parsing for reviewstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rs")]
#[command(author, version, about = "Inspect saved use-case reviews", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved reviews
    List,

    /// Print the saved analysis for a use case
    Show {
        /// Use case name
        #[arg(required = true)]
        usecase: String,
    },

    /// List use cases marked as reviewed
    Reviewed,

    /// Mark a use case as reviewed
    Mark {
        /// Use case name
        #[arg(required = true)]
        usecase: String,
    },

    /// Remove the reviewed mark from a use case
    Unmark {
        /// Use case name
        #[arg(required = true)]
        usecase: String,
    },
}
