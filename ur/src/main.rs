//! Use-case review - LLM-assisted review of detection use cases
//!
//! CLI entry point for the interactive REPL and one-shot commands.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use reviewstore::ReviewStore;
use usecase_review::cli::{Cli, Command, generate_after_help, get_log_path};
use usecase_review::config::Config;
use usecase_review::dataset::DatasetLoader;
use usecase_review::llm::create_client;
use usecase_review::prompts::PromptBuilder;
use usecase_review::repl;
use usecase_review::session::{Session, SessionError, load_reviewed_or_empty};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local .env overrides; absence is fine
    let dotenv = dotenvy::dotenv().ok();

    let help_llm = Config::load(None).map(|c| c.llm).unwrap_or_default();
    let cmd = Cli::command().after_help(generate_after_help(&help_llm));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;
    if let Some(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("Use-case review loaded config: endpoint={}", config.llm.endpoint);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Repl) => {
            debug!("main: matched Repl command");
            repl::run_interactive(&config).await
        }
        Some(Command::List) => {
            debug!("main: matched List command");
            cmd_list(&config)
        }
        Some(Command::Prompt { usecase }) => {
            debug!(%usecase, "main: matched Prompt command");
            cmd_prompt(&config, &usecase)
        }
        Some(Command::Analyze {
            usecase,
            prompt_file,
            save,
            review,
        }) => {
            debug!(%usecase, ?prompt_file, save, "main: matched Analyze command");
            cmd_analyze(&config, &usecase, prompt_file, save, review).await
        }
    }
}

fn cmd_list(config: &Config) -> Result<()> {
    let catalog = DatasetLoader::new().load_or_empty(&config.data.dataset);
    let reviewed = load_reviewed_or_empty(&ReviewStore::open(&config.data.store_dir)?);

    if catalog.is_empty() {
        println!("No use cases loaded from {}", config.data.dataset.display());
        return Ok(());
    }

    for (i, name) in catalog.names().enumerate() {
        let mark = if reviewed.contains(name) { "✓".green() } else { " ".normal() };
        println!("{:>3}. {} {}", i + 1, mark, name);
    }
    Ok(())
}

fn cmd_prompt(config: &Config, usecase: &str) -> Result<()> {
    let catalog = DatasetLoader::new().load_or_empty(&config.data.dataset);
    let Some(found) = catalog.get(usecase) else {
        return Err(eyre::eyre!("Unknown use case: {}", usecase));
    };

    let prompts = PromptBuilder::new(config.data.prompt_dir.as_deref())?;
    println!("{}", prompts.build(found)?);
    Ok(())
}

async fn cmd_analyze(
    config: &Config,
    usecase: &str,
    prompt_file: Option<PathBuf>,
    save: bool,
    review: Option<String>,
) -> Result<()> {
    let llm = create_client(&config.llm)?;
    let mut session = Session::from_config(config, llm)?;
    session.select(usecase)?;

    let prompt = match prompt_file {
        Some(path) => Some(
            fs::read_to_string(&path).context(format!("Failed to read prompt file {}", path.display()))?,
        ),
        None => None,
    };

    match session.analyze(prompt).await {
        Ok(analysis) => println!("{}", analysis),
        Err(SessionError::NoTechniqueData(_)) => {
            println!("{}", "No technique data available.".yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    if save || review.is_some() {
        let record = session.save(review.as_deref())?;
        println!();
        println!("{} Saved review for {} at {}", "✓".green(), usecase.cyan(), record.timestamp.dimmed());
    }
    Ok(())
}
