//! REPL session management

use std::path::PathBuf;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::llm::Role;
use crate::session::{Session, SessionError};

/// Mark shown beside reviewed use cases
const REVIEWED_MARK: &str = "✓";

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    Clear,
    History,
    List,
    Select(String),
    Prompt,
    Analyze(Option<PathBuf>),
    Save(Option<String>),
    Unknown(String),
}

/// Parse a line starting with `/`
///
/// Everything after the command word is one argument, so use-case names and
/// review text may contain spaces.
pub fn parse_slash_command(input: &str) -> SlashCommand {
    let input = input.trim();
    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (input, None),
    };

    match cmd {
        "/help" | "/h" => SlashCommand::Help,
        "/quit" | "/q" | "/exit" => SlashCommand::Quit,
        "/clear" | "/c" => SlashCommand::Clear,
        "/history" => SlashCommand::History,
        "/list" | "/l" => SlashCommand::List,
        "/select" | "/s" => match arg {
            Some(name) => SlashCommand::Select(name.to_string()),
            None => SlashCommand::Unknown("/select needs a use case name or number".to_string()),
        },
        "/prompt" => SlashCommand::Prompt,
        "/analyze" | "/a" => SlashCommand::Analyze(arg.map(PathBuf::from)),
        "/save" => SlashCommand::Save(arg.map(str::to_string)),
        other => SlashCommand::Unknown(format!("Unknown command: {}", other)),
    }
}

/// Interactive REPL session
pub struct ReplSession {
    session: Session,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        // Create readline editor for proper line editing
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&self.prompt());

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(parse_slash_command(input)).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.ask(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.session.selected() {
            Some((name, _)) => format!("{} {} ", name.cyan(), ">".bright_green()),
            None => format!("{} ", ">".bright_green()),
        }
    }

    fn print_welcome(&self) {
        let entries = self.session.usecases();
        let reviewed = entries.iter().filter(|e| e.reviewed).count();

        println!();
        println!("{}", "Use-Case Review".bright_cyan().bold());
        println!("{} use cases, {} reviewed", entries.len(), reviewed);
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, command: SlashCommand) -> SlashResult {
        match command {
            SlashCommand::Help => self.print_help(),
            SlashCommand::Quit => return SlashResult::Quit,
            SlashCommand::Clear => {
                self.session.clear();
                println!("{}", "Conversation cleared.".dimmed());
            }
            SlashCommand::History => self.print_history(),
            SlashCommand::List => self.print_list(),
            SlashCommand::Select(target) => self.select(&target),
            SlashCommand::Prompt => match self.session.default_prompt() {
                Ok(prompt) => println!("{}", prompt),
                Err(e) => print_error(&e),
            },
            SlashCommand::Analyze(prompt_file) => self.analyze(prompt_file).await,
            SlashCommand::Save(review) => match self.session.save(review.as_deref()) {
                Ok(record) => println!("{} Saved at {}", REVIEWED_MARK.green(), record.timestamp.dimmed()),
                Err(e) => print_error(&e),
            },
            SlashCommand::Unknown(msg) => {
                println!("{} {}", "?".yellow(), msg);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    /// Select by name, or by 1-based position in the listing
    fn select(&mut self, target: &str) {
        let name = match target.parse::<usize>() {
            Ok(n) if n >= 1 => match self.session.usecases().get(n - 1) {
                Some(entry) => entry.name.clone(),
                None => {
                    println!("{} No use case #{}", "?".yellow(), n);
                    return;
                }
            },
            _ => target.to_string(),
        };

        match self.session.select(&name) {
            Ok(usecase) => {
                println!("{} {}", "Selected".bright_cyan(), name.bright_white());
                if !usecase.has_techniques() {
                    println!("{}", "No technique data available.".yellow());
                }
            }
            Err(e) => print_error(&e),
        }
    }

    async fn analyze(&mut self, prompt_file: Option<PathBuf>) {
        let prompt = match prompt_file {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(text) => Some(text),
                Err(e) => {
                    println!("{} Failed to read {}: {}", "Error:".red(), path.display(), e);
                    return;
                }
            },
            None => None,
        };

        println!("{}", "Analyzing...".dimmed());
        match self.session.analyze(prompt).await {
            Ok(analysis) => {
                println!();
                println!("{}", analysis);
                println!();
            }
            Err(e) => print_error(&e),
        }
    }

    async fn ask(&mut self, question: &str) {
        match self.session.followup(question).await {
            Ok(answer) => {
                println!();
                println!("{}", answer);
                println!();
            }
            Err(e) => print_error(&e),
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:22} Show this help", "/help".yellow());
        println!("  {:22} Exit the REPL", "/quit".yellow());
        println!("  {:22} List use cases", "/list".yellow());
        println!("  {:22} Select a use case", "/select <name|number>".yellow());
        println!("  {:22} Show the generated prompt", "/prompt".yellow());
        println!("  {:22} Run the initial analysis", "/analyze [prompt-file]".yellow());
        println!("  {:22} Save and mark reviewed", "/save [final review]".yellow());
        println!("  {:22} Show the conversation", "/history".yellow());
        println!("  {:22} Clear the conversation", "/clear".yellow());
        println!();
        println!("Anything else is a follow-up question on the current analysis.");
        println!();
    }

    fn print_list(&self) {
        let entries = self.session.usecases();
        if entries.is_empty() {
            println!("{}", "No use cases loaded.".dimmed());
            return;
        }

        println!();
        for (i, entry) in entries.iter().enumerate() {
            let mark = if entry.reviewed { REVIEWED_MARK.green() } else { " ".normal() };
            println!("  {:>3}. {} {}", i + 1, mark, entry.name);
        }
        println!();
    }

    fn print_history(&self) {
        let messages = self.session.conversation().messages();
        if messages.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }

        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for msg in messages {
            let role = match msg.role {
                Role::System => msg.role.title().dimmed(),
                Role::User => msg.role.title().bright_green(),
                Role::Assistant => msg.role.title().bright_blue(),
            };
            println!("{}: {}", role, msg.content);
            println!();
        }
    }
}

fn print_error(err: &SessionError) {
    match err {
        SessionError::NoTechniqueData(_) => println!("{}", err.to_string().yellow()),
        _ => println!("{} {}", "Error:".red(), err),
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}
