use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use reviewstore::ReviewStore;
use reviewstore::cli::{Cli, Command};
use reviewstore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_dir = cli.dir.unwrap_or(config.store_dir);

    let store = ReviewStore::open(&store_dir)?;
    info!("reviewstore opened {}", store.base_path().display());

    match cli.command {
        Command::List => {
            let records = store.records()?;
            let reviewed = store.load_reviewed()?;
            if records.is_empty() {
                println!("No reviews found");
            } else {
                for (usecase, record) in records {
                    let mark = if reviewed.contains(&usecase) {
                        "✓".green()
                    } else {
                        " ".normal()
                    };
                    println!("{} {} {}", mark, usecase.cyan(), record.timestamp.dimmed());
                }
            }
        }
        Command::Show { usecase } => match store.get_record(&usecase)? {
            Some(record) => {
                println!("{} {}", usecase.cyan().bold(), record.timestamp.dimmed());
                println!();
                println!("{}", record.analysis);
            }
            None => {
                return Err(eyre::eyre!("No review saved for use case: {}", usecase));
            }
        },
        Command::Reviewed => {
            let reviewed = store.load_reviewed()?;
            if reviewed.is_empty() {
                println!("No use cases reviewed");
            } else {
                for usecase in reviewed {
                    println!("{}", usecase);
                }
            }
        }
        Command::Mark { usecase } => {
            if store.mark_reviewed(&usecase)? {
                println!("{} Marked reviewed: {}", "✓".green(), usecase.cyan());
            } else {
                println!("Already reviewed: {}", usecase);
            }
        }
        Command::Unmark { usecase } => {
            if store.unmark_reviewed(&usecase)? {
                println!("{} Unmarked: {}", "✓".green(), usecase.cyan());
            } else {
                println!("Not reviewed: {}", usecase);
            }
        }
    }

    Ok(())
}
